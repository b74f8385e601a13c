//! Test modules for the notification system

mod attached_subscribers;
