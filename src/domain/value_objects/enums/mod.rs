pub mod agreement_statuses;
pub mod subscription_statuses;
