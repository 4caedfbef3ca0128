use super::error::PlanError;

pub type PlanResult<T> = std::result::Result<T, PlanError>;

/// Keeps the first error seen while the remaining items of a construct are
/// still walked.
#[derive(Debug, Default)]
pub struct FirstError(Option<PlanError>);

impl FirstError {
    pub fn new() -> Self {
        FirstError(None)
    }

    /// Records `err` unless an earlier error is already held.
    pub fn record(&mut self, err: PlanError) {
        if self.0.is_none() {
            self.0 = Some(err);
        }
    }

    /// Folds one item result in; returns the value when the item succeeded.
    pub fn absorb<T>(&mut self, res: PlanResult<T>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(e) => {
                self.record(e);
                None
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn finish<T>(self, value: T) -> PlanResult<T> {
        match self.0 {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let mut first = FirstError::new();
        let mut walked = 0;
        for i in 0..3 {
            walked += 1;
            let res: PlanResult<usize> = if i == 0 {
                Ok(i)
            } else {
                Err(PlanError::Internal(format!("item {}", i)))
            };
            first.absorb(res);
        }
        assert_eq!(walked, 3);
        assert!(first.is_set());
        match first.finish(()) {
            Err(PlanError::Internal(msg)) => assert_eq!(msg, "item 1"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_finish_without_error() {
        let first = FirstError::new();
        assert_eq!(first.finish(7).unwrap(), 7);
    }
}
