//! TCP listeners: the portal itself and the closed-port decoy.

pub mod listener;
