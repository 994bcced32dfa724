pub mod controller;

pub mod remote;

pub mod store;
