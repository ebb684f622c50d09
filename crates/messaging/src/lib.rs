//! Client-side messaging core for BandConnect.
//!
//! [`MessageRepository`] owns messages, the derived conversation index and band
//! members' quick responses. Reads are either snapshots or live [`Projection`]s that
//! emit once per committed mutation.
pub mod clock;
pub mod error;
pub mod ids;
pub mod repository;
pub mod signal;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MessagingError, MessagingResult};
pub use ids::{ConversationId, MessageId, QuickResponseId};
pub use repository::{MessageRepository, Projection};
pub use signal::{Signal, Subscription};
pub use types::{
    Conversation, Location, Message, MessagePriority, MessageStatus, NewMessage, QuickResponse,
};
