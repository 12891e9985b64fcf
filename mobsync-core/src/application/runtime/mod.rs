mod domain_loop;

pub use domain_loop::{DomainLoop, QueueError};
