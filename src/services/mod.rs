pub mod lifecycle;
pub mod notifier;
pub mod query;
pub mod router;
pub mod transfer;
pub mod validator;

pub use lifecycle::LifecycleService;
pub use notifier::{EventPublisher, InMemoryPublisher, NotificationEmitter, RedisQueuePublisher};
pub use query::TransactionQueryService;
pub use router::{resolve, ResolvedEndpoint, RoutePlan, TransferRouter};
pub use transfer::TransferService;
pub use validator::LimitValidator;
