use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::transport::{ClientError, Method, Transport};
use crate::entities::{
    daily_goal, monthly_plan, study_group, study_resource, study_session, syllabus_topic,
};
use crate::model::{
    DailyGoalChanges, DailyGoalInput, MonthlyPlanCompletion, MonthlyPlanInput, StudyGroupInput,
    StudyResourceInput, StudySessionInput, SyllabusTopicInput,
};

pub type DailyGoal = daily_goal::Model;
pub type MonthlyPlan = monthly_plan::Model;
pub type StudySession = study_session::Model;
pub type SyllabusTopic = syllabus_topic::Model;
pub type StudyResource = study_resource::Model;
pub type StudyGroup = study_group::Model;

pub trait Record: Clone + Send + Sync + DeserializeOwned + 'static {
    fn record_id(&self) -> i64;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            fn record_id(&self) -> i64 {
                self.id
            }
        })*
    };
}

impl_record!(
    DailyGoal,
    MonthlyPlan,
    StudySession,
    SyllabusTopic,
    StudyResource,
    StudyGroup,
);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    pub phase: Phase,
    pub items: Vec<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            items: Vec::new(),
        }
    }
}

/// One resource collection held by the store.
///
/// The lock is only held while reading or patching state, never across a
/// network call, so concurrent actions race and the last response to land
/// wins.
pub struct Collection<T> {
    path: &'static str,
    state: Mutex<Snapshot<T>>,
}

impl<T: Record> Collection<T> {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            state: Mutex::new(Snapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<T> {
        self.state.lock().await.clone()
    }

    async fn fetch(&self, api: &dyn Transport, query: &str) -> Result<(), ClientError> {
        self.state.lock().await.phase = Phase::Loading;
        let path = format!("{}{}", self.path, query);
        let result = api
            .request(Method::Get, &path, None)
            .await
            .and_then(|value| Ok(serde_json::from_value::<Vec<T>>(value)?));
        let mut state = self.state.lock().await;
        match result {
            Ok(items) => {
                debug!(path = self.path, count = items.len(), "collection loaded");
                state.items = items;
                state.phase = Phase::Loaded;
                Ok(())
            }
            Err(err) => {
                state.phase = Phase::Failed(err.to_string());
                Err(err)
            }
        }
    }

    async fn add(&self, api: &dyn Transport, body: Value) -> Result<T, ClientError> {
        let value = api.request(Method::Post, self.path, Some(body)).await?;
        let record: T = serde_json::from_value(value)?;
        self.state.lock().await.items.push(record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        api: &dyn Transport,
        method: Method,
        suffix: &str,
        id: i64,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let path = format!("{}/{id}{suffix}", self.path);
        let value = api.request(method, &path, body).await?;
        let record: T = serde_json::from_value(value)?;
        let mut state = self.state.lock().await;
        if let Some(slot) = state
            .items
            .iter_mut()
            .find(|item| item.record_id() == record.record_id())
        {
            *slot = record.clone();
        }
        Ok(record)
    }

    async fn remove(&self, api: &dyn Transport, id: i64) -> Result<(), ClientError> {
        let path = format!("{}/{id}", self.path);
        api.request(Method::Delete, &path, None).await?;
        self.state
            .lock()
            .await
            .items
            .retain(|item| item.record_id() != id);
        Ok(())
    }
}

/// Client-side source of truth for every resource collection.
pub struct StudyStore<A: Transport> {
    api: A,
    pub daily_goals: Collection<DailyGoal>,
    pub monthly_plans: Collection<MonthlyPlan>,
    pub sessions: Collection<StudySession>,
    pub syllabus: Collection<SyllabusTopic>,
    pub resources: Collection<StudyResource>,
    pub groups: Collection<StudyGroup>,
}

impl<A: Transport> StudyStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            daily_goals: Collection::new("/goals/daily"),
            monthly_plans: Collection::new("/goals/monthly"),
            sessions: Collection::new("/sessions"),
            syllabus: Collection::new("/syllabus"),
            resources: Collection::new("/resources"),
            groups: Collection::new("/groups"),
        }
    }

    pub async fn fetch_daily_goals(&self, date: Option<NaiveDate>) -> Result<(), ClientError> {
        let query = date.map(|date| format!("?date={date}")).unwrap_or_default();
        self.daily_goals.fetch(&self.api, &query).await
    }

    pub async fn add_daily_goal(
        &self,
        task: &str,
        date: NaiveDate,
    ) -> Result<DailyGoal, ClientError> {
        let body = to_body(&DailyGoalInput {
            task: task.to_string(),
            date,
        })?;
        self.daily_goals.add(&self.api, body).await
    }

    pub async fn update_daily_goal(
        &self,
        id: i64,
        changes: &DailyGoalChanges,
    ) -> Result<DailyGoal, ClientError> {
        self.daily_goals
            .replace(&self.api, Method::Put, "", id, Some(to_body(changes)?))
            .await
    }

    pub async fn toggle_daily_goal(&self, id: i64) -> Result<DailyGoal, ClientError> {
        self.daily_goals
            .replace(&self.api, Method::Patch, "/toggle", id, None)
            .await
    }

    pub async fn delete_daily_goal(&self, id: i64) -> Result<(), ClientError> {
        self.daily_goals.remove(&self.api, id).await
    }

    pub async fn fetch_monthly_plans(&self) -> Result<(), ClientError> {
        self.monthly_plans.fetch(&self.api, "").await
    }

    pub async fn add_monthly_plan(
        &self,
        input: &MonthlyPlanInput,
    ) -> Result<MonthlyPlan, ClientError> {
        self.monthly_plans.add(&self.api, to_body(input)?).await
    }

    pub async fn edit_monthly_plan(
        &self,
        id: i64,
        input: &MonthlyPlanInput,
    ) -> Result<MonthlyPlan, ClientError> {
        self.monthly_plans
            .replace(&self.api, Method::Put, "", id, Some(to_body(input)?))
            .await
    }

    pub async fn set_monthly_plan_completed(
        &self,
        id: i64,
        completed: bool,
    ) -> Result<MonthlyPlan, ClientError> {
        let body = to_body(&MonthlyPlanCompletion { completed })?;
        self.monthly_plans
            .replace(&self.api, Method::Patch, "", id, Some(body))
            .await
    }

    pub async fn toggle_monthly_plan(&self, id: i64) -> Result<MonthlyPlan, ClientError> {
        self.monthly_plans
            .replace(&self.api, Method::Patch, "/toggle", id, None)
            .await
    }

    pub async fn delete_monthly_plan(&self, id: i64) -> Result<(), ClientError> {
        self.monthly_plans.remove(&self.api, id).await
    }

    pub async fn fetch_sessions(&self, date: Option<NaiveDate>) -> Result<(), ClientError> {
        let query = date.map(|date| format!("?date={date}")).unwrap_or_default();
        self.sessions.fetch(&self.api, &query).await
    }

    pub async fn add_session(
        &self,
        input: &StudySessionInput,
    ) -> Result<StudySession, ClientError> {
        self.sessions.add(&self.api, to_body(input)?).await
    }

    pub async fn delete_session(&self, id: i64) -> Result<(), ClientError> {
        self.sessions.remove(&self.api, id).await
    }

    pub async fn fetch_syllabus(&self, subject: Option<&str>) -> Result<(), ClientError> {
        let query = subject
            .map(|subject| {
                let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("subject", subject)
                    .finish();
                format!("?{encoded}")
            })
            .unwrap_or_default();
        self.syllabus.fetch(&self.api, &query).await
    }

    pub async fn add_syllabus_topic(
        &self,
        input: &SyllabusTopicInput,
    ) -> Result<SyllabusTopic, ClientError> {
        self.syllabus.add(&self.api, to_body(input)?).await
    }

    pub async fn toggle_syllabus_topic(&self, id: i64) -> Result<SyllabusTopic, ClientError> {
        self.syllabus
            .replace(&self.api, Method::Patch, "/toggle", id, None)
            .await
    }

    pub async fn delete_syllabus_topic(&self, id: i64) -> Result<(), ClientError> {
        self.syllabus.remove(&self.api, id).await
    }

    pub async fn fetch_resources(&self) -> Result<(), ClientError> {
        self.resources.fetch(&self.api, "").await
    }

    pub async fn add_resource(
        &self,
        input: &StudyResourceInput,
    ) -> Result<StudyResource, ClientError> {
        self.resources.add(&self.api, to_body(input)?).await
    }

    pub async fn delete_resource(&self, id: i64) -> Result<(), ClientError> {
        self.resources.remove(&self.api, id).await
    }

    pub async fn fetch_groups(&self) -> Result<(), ClientError> {
        self.groups.fetch(&self.api, "").await
    }

    pub async fn add_group(&self, input: &StudyGroupInput) -> Result<StudyGroup, ClientError> {
        self.groups.add(&self.api, to_body(input)?).await
    }

    pub async fn delete_group(&self, id: i64) -> Result<(), ClientError> {
        self.groups.remove(&self.api, id).await
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    type Reply = Result<Value, ClientError>;

    /// Replays scripted replies in order and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: StdMutex<VecDeque<Reply>>,
        calls: StdMutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<Reply>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::default(),
            }
        }

        fn calls(&self) -> Vec<(Method, String, Option<Value>)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Reply {
            self.calls
                .lock()
                .expect("calls lock")
                .push((method, path.to_string(), body));
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .expect("scripted reply")
        }
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    fn goal(id: i64, task: &str, completed: bool) -> DailyGoal {
        DailyGoal {
            id,
            user_id: "alice".to_string(),
            task: task.to_string(),
            date: date("2024-01-15"),
            completed,
            created_at: Utc::now(),
        }
    }

    fn json<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).expect("json")
    }

    fn rejected(status: u16, message: &str) -> Reply {
        Err(ClientError::Api {
            status,
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn fetch_replaces_collection_and_marks_loaded() {
        let api = Arc::new(ScriptedTransport::with(vec![
            Ok(json(&vec![goal(1, "a", false), goal(2, "b", true)])),
            Ok(json(&vec![goal(3, "c", false)])),
        ]));
        let store = StudyStore::new(Arc::clone(&api));
        assert_eq!(store.daily_goals.snapshot().await.phase, Phase::Idle);

        store
            .fetch_daily_goals(Some(date("2024-01-15")))
            .await
            .expect("fetch");
        let snapshot = store.daily_goals.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Loaded);
        assert_eq!(snapshot.items.len(), 2);

        store.fetch_daily_goals(None).await.expect("refetch");
        let ids: Vec<i64> = store
            .daily_goals
            .snapshot()
            .await
            .items
            .iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![3]);
        let paths: Vec<String> = api.calls().into_iter().map(|(_, path, _)| path).collect();
        assert_eq!(paths, vec!["/goals/daily?date=2024-01-15", "/goals/daily"]);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_items_and_records_reason() {
        let api = Arc::new(ScriptedTransport::with(vec![
            Ok(json(&vec![goal(1, "a", false)])),
            rejected(500, "Server Error"),
        ]));
        let store = StudyStore::new(Arc::clone(&api));
        store.fetch_daily_goals(None).await.expect("fetch");
        let err = store.fetch_daily_goals(None).await.expect_err("failure");
        assert_eq!(err.to_string(), "Server Error");

        let snapshot = store.daily_goals.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Failed("Server Error".to_string()));
        assert_eq!(snapshot.items.len(), 1);
    }

    #[tokio::test]
    async fn add_appends_only_after_success() {
        let created = goal(7, "Read chapter 1", false);
        let api = Arc::new(ScriptedTransport::with(vec![
            Ok(json(&Vec::<DailyGoal>::new())),
            rejected(400, "task cannot be empty"),
            Ok(json(&created)),
        ]));
        let store = StudyStore::new(Arc::clone(&api));
        store.fetch_daily_goals(None).await.expect("fetch");

        let err = store
            .add_daily_goal("", date("2024-01-15"))
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "task cannot be empty");
        assert!(store.daily_goals.snapshot().await.items.is_empty());

        let added = store
            .add_daily_goal("Read chapter 1", date("2024-01-15"))
            .await
            .expect("add");
        assert_eq!(added, created);
        assert_eq!(store.daily_goals.snapshot().await.items, vec![created]);

        let (method, path, body) = api.calls().pop().expect("call");
        assert_eq!(method, Method::Post);
        assert_eq!(path, "/goals/daily");
        assert_eq!(
            body,
            Some(serde_json::json!({"task": "Read chapter 1", "date": "2024-01-15"}))
        );
    }

    #[tokio::test]
    async fn toggle_replaces_matching_record() {
        let api = Arc::new(ScriptedTransport::with(vec![
            Ok(json(&vec![goal(1, "a", false), goal(2, "b", false)])),
            Ok(json(&goal(2, "b", true))),
        ]));
        let store = StudyStore::new(Arc::clone(&api));
        store.fetch_daily_goals(None).await.expect("fetch");
        store.toggle_daily_goal(2).await.expect("toggle");

        let items = store.daily_goals.snapshot().await.items;
        assert!(!items[0].completed);
        assert!(items[1].completed);
        let (method, path, _) = api.calls().pop().expect("call");
        assert_eq!(method, Method::Patch);
        assert_eq!(path, "/goals/daily/2/toggle");
    }

    #[tokio::test]
    async fn rejected_delete_leaves_collection_unchanged() {
        let api = Arc::new(ScriptedTransport::with(vec![
            Ok(json(&vec![goal(1, "a", false)])),
            rejected(404, "Not found: daily goal id 1"),
            Ok(Value::Null),
        ]));
        let store = StudyStore::new(Arc::clone(&api));
        store.fetch_daily_goals(None).await.expect("fetch");

        let err = store.delete_daily_goal(1).await.expect_err("rejected");
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        assert_eq!(store.daily_goals.snapshot().await.items.len(), 1);

        store.delete_daily_goal(1).await.expect("delete");
        assert!(store.daily_goals.snapshot().await.items.is_empty());
    }

    #[tokio::test]
    async fn monthly_completion_sends_only_completed_field() {
        let plan = MonthlyPlan {
            id: 4,
            user_id: "alice".to_string(),
            subject: "Math".to_string(),
            target: "5 chapters".to_string(),
            deadline: date("2024-01-01"),
            completed: true,
            created_at: Utc::now(),
        };
        let api = Arc::new(ScriptedTransport::with(vec![Ok(json(&plan))]));
        let store = StudyStore::new(Arc::clone(&api));
        let updated = store
            .set_monthly_plan_completed(4, true)
            .await
            .expect("complete");
        assert!(updated.completed);
        let (method, path, body) = api.calls().pop().expect("call");
        assert_eq!(method, Method::Patch);
        assert_eq!(path, "/goals/monthly/4");
        assert_eq!(body, Some(serde_json::json!({"completed": true})));
    }

    #[tokio::test]
    async fn syllabus_subject_filter_is_url_encoded() {
        let api = Arc::new(ScriptedTransport::with(vec![Ok(json(
            &Vec::<SyllabusTopic>::new(),
        ))]));
        let store = StudyStore::new(Arc::clone(&api));
        store
            .fetch_syllabus(Some("Computer Science & AI"))
            .await
            .expect("fetch");
        let (_, path, _) = api.calls().pop().expect("call");
        assert_eq!(path, "/syllabus?subject=Computer+Science+%26+AI");
    }
}
