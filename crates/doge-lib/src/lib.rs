// ============================
// doge-lib/src/lib.rs
// ============================
//! Core functionality for the doge demo server: a photo-upload web app with
//! a real-time alert endpoint over a document store.

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod graphite;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod photo;
pub mod seed;
pub mod storage;
pub mod users;
pub mod ws_router;

use crate::broker::{AppRouter, Broker};
use crate::config::Settings;
use crate::dispatch::DispatchPool;
use crate::error::AppError;
use crate::health::StoreHealthIndicator;
use crate::photo::{DogePhotoManipulator, PhotoFolder, PhotoManipulator};
use crate::storage::DocumentStore;
use crate::users::UserRepository;
use crate::ws_router::FallbackSessions;
use axum::Router;
use std::sync::Arc;

/// Name of the photo partition in the document store
const PHOTO_FOLDER: &str = "photos";

/// Application state shared across all handlers
pub struct AppState<S> {
    /// User repository
    pub users: Arc<UserRepository<S>>,
    /// Photo folder adapter, scoped to the `photos` partition
    pub photos: Arc<PhotoFolder<S>>,
    /// Stateless photo manipulator
    pub manipulator: Arc<dyn PhotoManipulator>,
    /// Message broker with bounded fan-out
    pub broker: Arc<Broker>,
    /// Application-destination route table
    pub app_routes: Arc<AppRouter>,
    /// Store health indicator
    pub health: Arc<StoreHealthIndicator<S>>,
    /// Long-poll fallback sessions
    pub fallback: Arc<FallbackSessions>,
    /// Settings
    pub settings: Arc<Settings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            photos: Arc::clone(&self.photos),
            manipulator: Arc::clone(&self.manipulator),
            broker: Arc::clone(&self.broker),
            app_routes: Arc::clone(&self.app_routes),
            health: Arc::clone(&self.health),
            fallback: Arc::clone(&self.fallback),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<S: DocumentStore> AppState<S> {
    /// Wire the application state around a store handle. The dispatch pool
    /// is sized here, once, for the process lifetime.
    pub fn new(store: S, settings: Settings) -> Result<Self, AppError> {
        let store = Arc::new(store);
        let dispatch = DispatchPool::new(
            settings.dispatch.min_workers,
            settings.dispatch.max_workers,
        );
        let broker = Arc::new(Broker::new(settings.broker.clone(), dispatch));
        let fallback = Arc::new(FallbackSessions::new());
        ws_router::start_session_reaper(Arc::clone(&fallback), Arc::clone(&broker));

        Ok(Self {
            users: Arc::new(UserRepository::new(Arc::clone(&store))),
            photos: Arc::new(PhotoFolder::new(Arc::clone(&store), PHOTO_FOLDER)),
            manipulator: Arc::new(DogePhotoManipulator),
            broker,
            app_routes: Arc::new(AppRouter::new()),
            health: Arc::new(StoreHealthIndicator::new(store)),
            fallback,
            settings: Arc::new(settings),
        })
    }
}

/// Full application router: real-time endpoint plus HTTP surface
pub fn create_app<S: DocumentStore + 'static>(state: Arc<AppState<S>>) -> Router {
    ws_router::create_router(Arc::clone(&state)).merge(handlers::http_router(state))
}
