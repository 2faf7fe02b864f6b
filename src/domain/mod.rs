//! Framework-agnostic domain types for money movement.

pub mod account;
pub mod event;
pub mod filter;
pub mod transaction;
pub mod transfer;

pub use account::{
    AccountOrigin, AccountUsage, BankAccount, CheckPayee, ContactSnapshot, LinkedCard,
    MailingAddress,
};
pub use event::{
    BankEvent, BankTransactionEvent, BankTransferEvent, PendingTransferEvent,
    PENDING_TRANSFER_EVENT_VERSION,
};
pub use filter::TransactionFilter;
pub use transaction::{
    BankRecord, CardDetail, CodeType, Direction, DisplayParties, HoldDetail, Partition,
    SideDetails, Transaction, TransactionLinks, TransactionStatus, TransactionSubtype,
    TransactionType, TransactionView,
};
pub use transfer::{
    EndpointRef, EndpointType, ExecuteRequest, FailureReason, MoneyTransfer, Party, PartyDetails, Rail,
    ReviewDecision, RoutingContext, TransferRequest, TransferStatus, SUPPORTED_CURRENCY,
};
