//! Occlusion queries, one per context.

use svga3d_protocol::state::QueryType;

use crate::error::CommandError;
use crate::gl::{consts as gl, GLuint, GlApi};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryState {
    #[default]
    Idle,
    Building,
    Issued,
}

pub(crate) fn query_type(ty: u32) -> Result<QueryType, CommandError> {
    QueryType::from_u32(ty).ok_or_else(|| CommandError::unknown("query type", ty))
}

/// The context's occlusion query object, created on first begin.
#[derive(Debug, Default)]
pub struct OcclusionQuery {
    name: GLuint,
    state: QueryState,
}

impl OcclusionQuery {
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Starts counting; a query that is still building is restarted.
    pub(crate) fn begin(&mut self, gl: &mut dyn GlApi) {
        if self.name == 0 {
            self.name = gl.gen_query();
        }
        if self.state == QueryState::Building {
            gl.end_query(gl::SAMPLES_PASSED);
        }
        gl.begin_query(gl::SAMPLES_PASSED, self.name);
        self.state = QueryState::Building;
    }

    pub(crate) fn end(&mut self, gl: &mut dyn GlApi) -> Result<(), CommandError> {
        if self.state != QueryState::Building {
            return Err(CommandError::Malformed("occlusion query ended without a begin"));
        }
        gl.end_query(gl::SAMPLES_PASSED);
        self.state = QueryState::Issued;
        Ok(())
    }

    /// Samples that passed; waits for the host result.
    pub(crate) fn result(&mut self, gl: &mut dyn GlApi) -> Result<u32, CommandError> {
        if self.state != QueryState::Issued {
            return Err(CommandError::Malformed("occlusion query result requested before its end"));
        }
        Ok(gl.get_query_object_u32(self.name, gl::QUERY_RESULT))
    }

    pub(crate) fn destroy(&mut self, gl: &mut dyn GlApi) {
        if self.state == QueryState::Building {
            gl.end_query(gl::SAMPLES_PASSED);
        }
        if self.name != 0 {
            gl.delete_query(self.name);
        }
        *self = Self::default();
    }
}
