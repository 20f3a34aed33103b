//! Scripted fakes
//!
//! A [`FakeMethod`] replays a script of replies, one per call, and records
//! every call's arguments. Calls past the end of the script return `null`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tapestry_domain::{AppError, StubBehavior};

use super::service::Service;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedReply {
    /// How the reply is delivered.
    pub behavior: StubBehavior,
    /// Returned value, or the error payload for failing behaviors.
    pub payload: Value,
}

impl ScriptedReply {
    /// Creates a reply.
    #[must_use]
    pub const fn new(behavior: StubBehavior, payload: Value) -> Self {
        Self { behavior, payload }
    }

    fn into_result(self) -> Result<Value, AppError> {
        if self.behavior.is_failure() {
            Err(AppError::from_value(self.payload))
        } else {
            Ok(self.payload)
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    script: VecDeque<ScriptedReply>,
    calls: Vec<Vec<Value>>,
}

/// A fake method shared between the installed fake service and the
/// context's `mocks` table.
#[derive(Debug, Clone)]
pub struct FakeMethod {
    name: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeMethod {
    /// Creates a fake with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Creates a fake replaying `replies` in order.
    #[must_use]
    pub fn scripted(name: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let fake = Self::new(name);
        fake.lock().script.extend(replies);
        fake
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a reply to the script.
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.lock().script.push_back(reply);
    }

    /// Records a call and returns the next scripted reply.
    ///
    /// # Errors
    ///
    /// Returns the scripted error for `throws` and `rejects` replies.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, AppError> {
        let mut state = self.lock();
        state.calls.push(args);
        state
            .script
            .pop_front()
            .map_or(Ok(Value::Null), ScriptedReply::into_result)
    }

    /// Arguments of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.lock().calls.clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Replies not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock().script.len()
    }

    /// Clears call history and the remaining script.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.script.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Fake replacement for a whole service class.
///
/// Every method of the class is faked: undeclared methods behave like a
/// fake with an empty script.
#[derive(Debug, Clone)]
pub struct FakeService {
    class_name: String,
    methods: BTreeMap<String, FakeMethod>,
}

impl FakeService {
    /// Creates a fake service from its fake methods.
    #[must_use]
    pub fn new(class_name: impl Into<String>, methods: BTreeMap<String, FakeMethod>) -> Self {
        Self {
            class_name: class_name.into(),
            methods,
        }
    }

    /// Class being replaced.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Declared fake methods.
    #[must_use]
    pub const fn methods(&self) -> &BTreeMap<String, FakeMethod> {
        &self.methods
    }
}

#[async_trait]
impl Service for FakeService {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, AppError> {
        match self.methods.get(method) {
            Some(fake) => fake.invoke(args),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn script() -> Vec<ScriptedReply> {
        vec![
            ScriptedReply::new(StubBehavior::Resolves, json!("first")),
            ScriptedReply::new(StubBehavior::Returns, json!("second")),
            ScriptedReply::new(StubBehavior::Rejects, json!({"message": "gone", "code": 410})),
        ]
    }

    #[test]
    fn test_replies_are_consumed_in_order() {
        let fake = FakeMethod::scripted("methodA", script());
        assert_eq!(fake.invoke(vec![]).unwrap(), json!("first"));
        assert_eq!(fake.invoke(vec![json!(1)]).unwrap(), json!("second"));

        let err = fake.invoke(vec![]).unwrap_err();
        assert_eq!(err.message, "gone");
        assert_eq!(err.data.get("code"), Some(&json!(410)));

        assert_eq!(fake.invoke(vec![]).unwrap(), Value::Null);
        assert_eq!(fake.call_count(), 4);
        assert_eq!(fake.calls()[1], vec![json!(1)]);
    }

    #[test]
    fn test_reset_clears_history_and_script() {
        let fake = FakeMethod::scripted("m", script());
        fake.invoke(vec![]).unwrap();
        fake.reset();
        assert_eq!(fake.call_count(), 0);
        assert_eq!(fake.remaining(), 0);
        assert_eq!(fake.invoke(vec![]).unwrap(), Value::Null);
    }

    #[test]
    fn test_clones_share_state() {
        let fake = FakeMethod::new("m");
        let other = fake.clone();
        other.push_reply(ScriptedReply::new(StubBehavior::Returns, json!(7)));
        assert_eq!(fake.invoke(vec![]).unwrap(), json!(7));
        assert_eq!(other.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fake_service_routes_calls() {
        let method = FakeMethod::scripted(
            "find",
            [ScriptedReply::new(StubBehavior::Throws, json!("nope"))],
        );
        let service = FakeService::new(
            "UserService",
            BTreeMap::from([("find".to_string(), method.clone())]),
        );

        assert_eq!(service.call("find", vec![]).await.unwrap_err().message, "nope");
        assert_eq!(service.call("other", vec![]).await.unwrap(), Value::Null);
        assert_eq!(method.call_count(), 1);
    }
}
