use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use crate::entities::{
    daily_goal, monthly_plan, study_group, study_resource, study_session, syllabus_topic,
};
use crate::error::AppError;
use crate::model::{
    DailyGoalChanges, DailyGoalInput, MonthlyPlanInput, StudyGroupInput, StudyResourceInput,
    StudySessionInput, SyllabusTopicInput,
};

/// Persistence service scoped to a single owner.
///
/// Every query filters on `user_id`, so a record owned by someone else is
/// indistinguishable from a missing one.
pub struct App {
    db: DatabaseConnection,
    owner: String,
}

impl App {
    pub fn new(db: DatabaseConnection, owner: String) -> Self {
        Self { db, owner }
    }

    pub async fn list_daily_goals(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<daily_goal::Model>, AppError> {
        let mut select =
            daily_goal::Entity::find().filter(daily_goal::Column::UserId.eq(self.owner.as_str()));
        if let Some(date) = date {
            select = select.filter(daily_goal::Column::Date.eq(date));
        }
        Ok(select
            .order_by_asc(daily_goal::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_daily_goal(
        &self,
        input: DailyGoalInput,
    ) -> Result<daily_goal::Model, AppError> {
        let task = required("task", &input.task)?;
        let active = daily_goal::ActiveModel {
            user_id: Set(self.owner.clone()),
            task: Set(task),
            date: Set(input.date),
            completed: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(&self.db).await?;
        debug!(id = model.id, owner = %self.owner, "daily goal created");
        Ok(model)
    }

    pub async fn get_daily_goal(&self, id: i64) -> Result<daily_goal::Model, AppError> {
        daily_goal::Entity::find_by_id(id)
            .filter(daily_goal::Column::UserId.eq(self.owner.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("daily goal id {id}")))
    }

    pub async fn update_daily_goal(
        &self,
        id: i64,
        changes: DailyGoalChanges,
    ) -> Result<daily_goal::Model, AppError> {
        if changes.is_empty() {
            return Err(AppError::InvalidInput(
                "no updatable fields provided (allowed: task, date, completed)".to_string(),
            ));
        }
        let task = changes
            .task
            .as_deref()
            .map(|task| required("task", task))
            .transpose()?;
        let mut active = self.get_daily_goal(id).await?.into_active_model();
        if let Some(task) = task {
            active.task = Set(task);
        }
        if let Some(date) = changes.date {
            active.date = Set(date);
        }
        if let Some(completed) = changes.completed {
            active.completed = Set(completed);
        }
        Ok(active.update(&self.db).await?)
    }

    /// Flips `completed` in a single statement so concurrent toggles never
    /// collapse into one.
    pub async fn toggle_daily_goal(&self, id: i64) -> Result<daily_goal::Model, AppError> {
        let result = daily_goal::Entity::update_many()
            .col_expr(
                daily_goal::Column::Completed,
                Expr::col(daily_goal::Column::Completed).not(),
            )
            .filter(daily_goal::Column::Id.eq(id))
            .filter(daily_goal::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("daily goal id {id}")));
        }
        self.get_daily_goal(id).await
    }

    pub async fn delete_daily_goal(&self, id: i64) -> Result<(), AppError> {
        let result = daily_goal::Entity::delete_many()
            .filter(daily_goal::Column::Id.eq(id))
            .filter(daily_goal::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("daily goal id {id}")));
        }
        Ok(())
    }

    pub async fn list_monthly_plans(&self) -> Result<Vec<monthly_plan::Model>, AppError> {
        Ok(monthly_plan::Entity::find()
            .filter(monthly_plan::Column::UserId.eq(self.owner.as_str()))
            .order_by_asc(monthly_plan::Column::Deadline)
            .order_by_asc(monthly_plan::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_monthly_plan(
        &self,
        input: MonthlyPlanInput,
    ) -> Result<monthly_plan::Model, AppError> {
        let subject = required("subject", &input.subject)?;
        let target = required("target", &input.target)?;
        let active = monthly_plan::ActiveModel {
            user_id: Set(self.owner.clone()),
            subject: Set(subject),
            target: Set(target),
            deadline: Set(input.deadline),
            completed: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(&self.db).await?;
        debug!(id = model.id, owner = %self.owner, "monthly plan created");
        Ok(model)
    }

    pub async fn get_monthly_plan(&self, id: i64) -> Result<monthly_plan::Model, AppError> {
        monthly_plan::Entity::find_by_id(id)
            .filter(monthly_plan::Column::UserId.eq(self.owner.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("monthly plan id {id}")))
    }

    /// Replaces the form fields of a plan. Completion is left untouched.
    pub async fn edit_monthly_plan(
        &self,
        id: i64,
        input: MonthlyPlanInput,
    ) -> Result<monthly_plan::Model, AppError> {
        let subject = required("subject", &input.subject)?;
        let target = required("target", &input.target)?;
        let mut active = self.get_monthly_plan(id).await?.into_active_model();
        active.subject = Set(subject);
        active.target = Set(target);
        active.deadline = Set(input.deadline);
        Ok(active.update(&self.db).await?)
    }

    pub async fn set_monthly_plan_completed(
        &self,
        id: i64,
        completed: bool,
    ) -> Result<monthly_plan::Model, AppError> {
        let mut active = self.get_monthly_plan(id).await?.into_active_model();
        active.completed = Set(completed);
        Ok(active.update(&self.db).await?)
    }

    pub async fn toggle_monthly_plan(&self, id: i64) -> Result<monthly_plan::Model, AppError> {
        let result = monthly_plan::Entity::update_many()
            .col_expr(
                monthly_plan::Column::Completed,
                Expr::col(monthly_plan::Column::Completed).not(),
            )
            .filter(monthly_plan::Column::Id.eq(id))
            .filter(monthly_plan::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("monthly plan id {id}")));
        }
        self.get_monthly_plan(id).await
    }

    pub async fn delete_monthly_plan(&self, id: i64) -> Result<(), AppError> {
        let result = monthly_plan::Entity::delete_many()
            .filter(monthly_plan::Column::Id.eq(id))
            .filter(monthly_plan::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("monthly plan id {id}")));
        }
        Ok(())
    }

    pub async fn list_study_sessions(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<study_session::Model>, AppError> {
        let mut select = study_session::Entity::find()
            .filter(study_session::Column::UserId.eq(self.owner.as_str()));
        if let Some(date) = date {
            select = select.filter(study_session::Column::Date.eq(date));
        }
        Ok(select
            .order_by_asc(study_session::Column::Date)
            .order_by_asc(study_session::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_study_session(
        &self,
        input: StudySessionInput,
    ) -> Result<study_session::Model, AppError> {
        let subject = required("subject", &input.subject)?;
        if input.duration_minutes <= 0 {
            return Err(AppError::InvalidInput(
                "duration_minutes must be greater than zero".to_string(),
            ));
        }
        let active = study_session::ActiveModel {
            user_id: Set(self.owner.clone()),
            subject: Set(subject),
            duration_minutes: Set(input.duration_minutes),
            date: Set(input.date),
            notes: Set(optional(input.notes)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn delete_study_session(&self, id: i64) -> Result<(), AppError> {
        let result = study_session::Entity::delete_many()
            .filter(study_session::Column::Id.eq(id))
            .filter(study_session::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("study session id {id}")));
        }
        Ok(())
    }

    pub async fn list_syllabus_topics(
        &self,
        subject: Option<&str>,
    ) -> Result<Vec<syllabus_topic::Model>, AppError> {
        let mut select = syllabus_topic::Entity::find()
            .filter(syllabus_topic::Column::UserId.eq(self.owner.as_str()));
        if let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(syllabus_topic::Column::Subject.eq(subject));
        }
        Ok(select
            .order_by_asc(syllabus_topic::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_syllabus_topic(
        &self,
        input: SyllabusTopicInput,
    ) -> Result<syllabus_topic::Model, AppError> {
        let subject = required("subject", &input.subject)?;
        let topic = required("topic", &input.topic)?;
        let active = syllabus_topic::ActiveModel {
            user_id: Set(self.owner.clone()),
            subject: Set(subject),
            topic: Set(topic),
            completed: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn toggle_syllabus_topic(
        &self,
        id: i64,
    ) -> Result<syllabus_topic::Model, AppError> {
        let not_found = || AppError::NotFound(format!("syllabus topic id {id}"));
        let result = syllabus_topic::Entity::update_many()
            .col_expr(
                syllabus_topic::Column::Completed,
                Expr::col(syllabus_topic::Column::Completed).not(),
            )
            .filter(syllabus_topic::Column::Id.eq(id))
            .filter(syllabus_topic::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found());
        }
        syllabus_topic::Entity::find_by_id(id)
            .filter(syllabus_topic::Column::UserId.eq(self.owner.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn delete_syllabus_topic(&self, id: i64) -> Result<(), AppError> {
        let result = syllabus_topic::Entity::delete_many()
            .filter(syllabus_topic::Column::Id.eq(id))
            .filter(syllabus_topic::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("syllabus topic id {id}")));
        }
        Ok(())
    }

    pub async fn list_study_resources(&self) -> Result<Vec<study_resource::Model>, AppError> {
        Ok(study_resource::Entity::find()
            .filter(study_resource::Column::UserId.eq(self.owner.as_str()))
            .order_by_asc(study_resource::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_study_resource(
        &self,
        input: StudyResourceInput,
    ) -> Result<study_resource::Model, AppError> {
        let title = required("title", &input.title)?;
        let url = validate_url(&input.url)?;
        let active = study_resource::ActiveModel {
            user_id: Set(self.owner.clone()),
            title: Set(title),
            url: Set(url),
            subject: Set(optional(input.subject)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn delete_study_resource(&self, id: i64) -> Result<(), AppError> {
        let result = study_resource::Entity::delete_many()
            .filter(study_resource::Column::Id.eq(id))
            .filter(study_resource::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("study resource id {id}")));
        }
        Ok(())
    }

    pub async fn list_study_groups(&self) -> Result<Vec<study_group::Model>, AppError> {
        Ok(study_group::Entity::find()
            .filter(study_group::Column::UserId.eq(self.owner.as_str()))
            .order_by_asc(study_group::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn add_study_group(
        &self,
        input: StudyGroupInput,
    ) -> Result<study_group::Model, AppError> {
        let name = required("name", &input.name)?;
        let active = study_group::ActiveModel {
            user_id: Set(self.owner.clone()),
            name: Set(name),
            description: Set(optional(input.description)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn delete_study_group(&self, id: i64) -> Result<(), AppError> {
        let result = study_group::Entity::delete_many()
            .filter(study_group::Column::Id.eq(id))
            .filter(study_group::Column::UserId.eq(self.owner.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("study group id {id}")));
        }
        Ok(())
    }
}

fn required(label: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn validate_url(value: &str) -> Result<String, AppError> {
    let trimmed = required("url", value)?;
    let parsed = url::Url::parse(&trimmed)
        .map_err(|err| AppError::InvalidInput(format!("url is not valid: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed),
        other => Err(AppError::InvalidInput(format!(
            "url scheme must be http or https, got {other}"
        ))),
    }
}
