use crate::web::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Validating,
    Submitting,
    Success,
    Failed,
}

impl FormState {
    fn can_move_to(self, next: FormState) -> bool {
        matches!(
            (self, next),
            (FormState::Idle, FormState::Validating)
                | (FormState::Validating, FormState::Submitting)
                | (FormState::Validating, FormState::Failed)
                | (FormState::Submitting, FormState::Success)
                | (FormState::Submitting, FormState::Failed)
        )
    }
}

/// One submission of a form: validate once, submit at most once.
///
/// A validation error never reaches the submit step. The inputs stay with the
/// caller, so a failed submission can be edited and resubmitted with a new flow.
pub struct FormFlow {
    name: &'static str,
    state: FormState,
    history: Vec<FormState>,
}

impl FormFlow {
    pub fn new(name: &'static str) -> Self {
        FormFlow {
            name,
            state: FormState::Idle,
            history: vec![FormState::Idle],
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn history(&self) -> &[FormState] {
        &self.history
    }

    fn transition(&mut self, next: FormState) -> ServiceResult<()> {
        if !self.state.can_move_to(next) {
            return Err(ServiceError::InternalServerError(
                format!("{}: invalid transition {:?} -> {:?}", self.name, self.state, next)
            ))
        }
        log::debug!("{}: {:?} -> {:?}", self.name, self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn finish<T>(&mut self, result: ServiceResult<T>, on_success: Option<FormState>) -> ServiceResult<T> {
        match result {
            Ok(value) => {
                if let Some(next) = on_success {
                    self.transition(next)?;
                }
                Ok(value)
            },
            Err(err) => {
                self.transition(FormState::Failed)?;
                Err(err)
            },
        }
    }

    pub fn validate<T, F>(&mut self, check: F) -> ServiceResult<T>
        where F: FnOnce() -> ServiceResult<T>
    {
        self.transition(FormState::Validating)?;
        let result = check();
        self.finish(result, None)
    }

    pub fn submit<T, F>(&mut self, call: F) -> ServiceResult<T>
        where F: FnOnce() -> ServiceResult<T>
    {
        self.transition(FormState::Submitting)?;
        let result = call();
        self.finish(result, Some(FormState::Success))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_submission() {
        let mut flow = FormFlow::new("test");
        let value = flow.validate(|| Ok(2)).unwrap();
        let doubled = flow.submit(|| Ok(value * 2)).unwrap();

        assert_eq!(doubled, 4);
        assert_eq!(flow.state(), FormState::Success);
        assert_eq!(flow.history(), &[
            FormState::Idle,
            FormState::Validating,
            FormState::Submitting,
            FormState::Success,
        ]);
    }

    #[test]
    fn validation_error_stops_before_submit() {
        let mut flow = FormFlow::new("test");
        let res: ServiceResult<()> = flow.validate(|| Err(ServiceError::validation("email", "missing")));

        assert!(res.is_err());
        assert_eq!(flow.state(), FormState::Failed);

        let mut called = false;
        let res = flow.submit(|| {
            called = true;
            Ok(())
        });
        assert!(res.is_err());
        assert!(!called);
    }

    #[test]
    fn submit_error_fails_the_flow() {
        let mut flow = FormFlow::new("test");
        flow.validate(|| Ok(())).unwrap();
        let res: ServiceResult<()> = flow.submit(|| Err(ServiceError::Backend("down".to_string())));

        assert_eq!(res, Err(ServiceError::Backend("down".to_string())));
        assert_eq!(flow.state(), FormState::Failed);
    }

    #[test]
    fn submit_requires_validation() {
        let mut flow = FormFlow::new("test");
        let res = flow.submit(|| Ok(()));

        assert!(matches!(res, Err(ServiceError::InternalServerError(_))));
        assert_eq!(flow.state(), FormState::Idle);
    }
}
