//! Request extractors for the controller and the request-scoped database handle.

mod controller;
mod database;
