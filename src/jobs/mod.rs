//! Background jobs run by the job scheduler service and the worker endpoint.
//!
//! - `notification_worker_job` - fans trend changes out into per-user notifications

pub mod notification_worker_job;
