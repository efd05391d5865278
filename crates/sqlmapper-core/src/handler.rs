//! Row bounds and caller-supplied result handlers.

use crate::value::Value;
use std::sync::{Arc, Mutex};

/// Offset/limit applied to a query's rows after they are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    /// No offset, no limit.
    pub const DEFAULT: RowBounds = RowBounds {
        offset: 0,
        limit: usize::MAX,
    };

    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The row handed to a [`ResultHandler`].
#[derive(Debug)]
pub struct ResultContext {
    object: Value,
    count: usize,
    stopped: bool,
}

impl ResultContext {
    pub fn new(object: Value, count: usize) -> Self {
        Self {
            object,
            count,
            stopped: false,
        }
    }

    /// The mapped row.
    pub fn result_object(&self) -> &Value {
        &self.object
    }

    /// Take ownership of the mapped row.
    pub fn take_result_object(&mut self) -> Value {
        std::mem::take(&mut self.object)
    }

    /// Rows delivered so far, including this one.
    pub fn result_count(&self) -> usize {
        self.count
    }

    /// Deliver no further rows.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Receives mapped rows one at a time instead of collecting them.
pub trait ResultHandler {
    fn handle_result(&mut self, context: &mut ResultContext);
}

impl<F> ResultHandler for F
where
    F: FnMut(&mut ResultContext),
{
    fn handle_result(&mut self, context: &mut ResultContext) {
        self(context);
    }
}

/// A result handler passed through a mapper argument list.
pub type ResultHandlerRef = Arc<Mutex<dyn ResultHandler + Send>>;

/// Collects every delivered row.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub rows: Vec<Value>,
}

impl ResultHandler for CollectingHandler {
    fn handle_result(&mut self, context: &mut ResultContext) {
        self.rows.push(context.take_result_object());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        assert!(RowBounds::default().is_default());
        assert!(!RowBounds::new(1, 10).is_default());
    }

    #[test]
    fn closure_handler_can_stop() {
        let mut seen = 0;
        let mut handler = |ctx: &mut ResultContext| {
            seen += 1;
            if ctx.result_count() == 2 {
                ctx.stop();
            }
        };
        let mut ctx = ResultContext::new(Value::Int(1), 2);
        handler.handle_result(&mut ctx);
        assert!(ctx.is_stopped());
        assert_eq!(seen, 1);
    }
}
