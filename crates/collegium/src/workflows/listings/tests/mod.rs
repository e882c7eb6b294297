mod access;
mod common;
mod search;
mod service;
