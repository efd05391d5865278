//! Lazily consumed query results.

use crate::result_set::RowMapper;
use sqlmapper_core::{Result, RowBounds, RowStream, Value};

/// Maps rows one at a time as they are pulled from the backend.
///
/// Nested selects are not resolved for cursor rows.
pub struct Cursor {
    rows: Option<RowStream>,
    mapper: RowMapper,
    bounds: RowBounds,
    skipped: bool,
    delivered: usize,
    consumed: bool,
}

impl Cursor {
    pub fn new(rows: RowStream, mapper: RowMapper, bounds: RowBounds) -> Self {
        Self {
            rows: Some(rows),
            mapper,
            bounds,
            skipped: false,
            delivered: 0,
            consumed: false,
        }
    }

    /// Has the backend stream not been released yet?
    pub fn is_open(&self) -> bool {
        self.rows.is_some()
    }

    /// Were all rows within the bounds read?
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Index of the last delivered row, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.delivered.checked_sub(1)
    }

    /// Release the backend stream. Further reads yield nothing.
    pub fn close(&mut self) {
        if self.rows.take().is_some() {
            tracing::debug!(delivered = self.delivered, "Closing cursor");
        }
    }

    fn finish(&mut self) {
        self.consumed = true;
        self.rows = None;
    }
}

impl Iterator for Cursor {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.delivered >= self.bounds.limit {
            self.finish();
            return None;
        }
        let rows = self.rows.as_mut()?;
        if !self.skipped {
            self.skipped = true;
            for _ in 0..self.bounds.offset {
                match rows.next() {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        self.finish();
                        return None;
                    }
                }
            }
        }
        match rows.next() {
            Some(Ok(row)) => {
                self.delivered += 1;
                Some(self.mapper.map_row(&row))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                self.finish();
                None
            }
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("open", &self.is_open())
            .field("consumed", &self.consumed)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmapper_core::{Configuration, MappedStatement, Row, SqlCommandType};

    fn cursor(n: i64, bounds: RowBounds) -> Cursor {
        let rows: Vec<Result<Row>> = (0..n)
            .map(|i| Ok(Row::new(vec!["id".into()], vec![Value::BigInt(i)])))
            .collect();
        let ms = MappedStatement::builder("M.all", SqlCommandType::Select, "SELECT id FROM t")
            .build()
            .unwrap();
        let mapper = RowMapper::new(&Configuration::default(), &ms);
        Cursor::new(Box::new(rows.into_iter()), mapper, bounds)
    }

    #[test]
    fn iterates_and_tracks_state() {
        let mut c = cursor(3, RowBounds::DEFAULT);
        assert!(c.is_open());
        assert_eq!(c.current_index(), None);
        let first = c.next().unwrap().unwrap();
        assert_eq!(first, Value::from_pairs([("id", Value::BigInt(0))]));
        assert_eq!(c.current_index(), Some(0));
        assert_eq!(c.by_ref().count(), 2);
        assert!(c.is_consumed());
        assert!(!c.is_open());
    }

    #[test]
    fn honors_bounds() {
        let ids: Vec<Value> = cursor(10, RowBounds::new(2, 3))
            .map(|r| r.unwrap().as_map().unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![Value::BigInt(2), Value::BigInt(3), Value::BigInt(4)]);
    }

    #[test]
    fn close_stops_iteration() {
        let mut c = cursor(3, RowBounds::DEFAULT);
        c.next();
        c.close();
        assert!(c.next().is_none());
        assert!(!c.is_consumed());
    }
}
