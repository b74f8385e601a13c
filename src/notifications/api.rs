//! Public API for the notification system
//!
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::notifications::error::{NotificationError, NotificationResult};
pub use crate::notifications::event::{
    AdvancerEvent, AdvancerEventType, Event, EventFilter, ExchangeEvent, ExchangeEventType,
};
pub use crate::notifications::manager::{EventReceiver, NotificationManager};
pub use crate::notifications::subscribers::LogSubscriber;
pub use crate::notifications::traits::{Subscriber, SubscriberStatistics};
