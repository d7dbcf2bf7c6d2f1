pub mod daily_goal;
pub mod monthly_plan;
pub mod study_group;
pub mod study_resource;
pub mod study_session;
pub mod syllabus_topic;
