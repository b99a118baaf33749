//! End-to-end checks of the login handshake and the provisioning pipeline
//! against in-memory and wiremock-backed collaborators.

mod login;
mod pipeline;
mod run;
