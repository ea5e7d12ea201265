//! Order dialogue: state machine, chat model, copy, handoff and the
//! session controller with its HTTP boundary.

pub mod controller;
pub mod handoff;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod state;

pub use controller::{ButtonAction, OrderSession, SessionServices, SessionSnapshot, UiEvent};
pub use handoff::{DeviceClass, HandoffOutcome, LinkOpener, LinkVariant};
pub use model::{Message, Sender, UserData};
pub use routes::{OrderRouteState, order_routes};
pub use state::{EditTarget, FlowStep};
