use std::fmt;

use super::{Publisher, Subscriber};

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_publisher(self, f)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_subscriber(self, f)
    }
}
