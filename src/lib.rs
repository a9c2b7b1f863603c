pub mod auth;
pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod feed;
pub mod handlers;
pub mod hashing;
pub mod models;
pub mod ranking;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod swipe;

use crate::{
    auth::JwtValidator,
    domain::{FeedHistoryRepository, MemeRepository, PerceptualHasher, VoteRepository},
};
use std::sync::Arc;

/// Shared resources handed to every handler. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub meme_repo: Arc<dyn MemeRepository>,
    pub vote_repo: Arc<dyn VoteRepository>,
    pub history_repo: Arc<dyn FeedHistoryRepository>,
    pub hasher: Arc<dyn PerceptualHasher>,
    pub jwt: JwtValidator,
}
