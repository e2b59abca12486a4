//! E2AP elementary procedures
//!
//! Each submodule holds the messages of one procedure together with the
//! parameter structs and helpers used to build and read them.
//!
//! | Procedure | Initiator | Module |
//! |---|---|---|
//! | E2 Setup | E2 node | [`setup`] |
//! | E2 Node Configuration Update | E2 node | [`configuration_update`] |
//! | E2 Connection Update | RIC | [`connection_update`] |
//! | RIC Subscription | RIC | [`subscription`] |
//! | RIC Subscription Delete | RIC | [`subscription_delete`] |
//! | RIC Control | RIC | [`control`] |
//! | RIC Indication | E2 node | [`indication`] |

pub mod configuration_update;
pub mod connection_update;
pub mod control;
pub mod indication;
pub mod setup;
pub mod subscription;
pub mod subscription_delete;

pub use configuration_update::*;
pub use connection_update::*;
pub use control::*;
pub use indication::*;
pub use setup::*;
pub use subscription::*;
pub use subscription_delete::*;
