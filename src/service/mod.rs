use std::sync::Arc;

use crate::platform::StreamPlatform;
use crate::repository::Repository;
use crate::service::subscription_service::SubscriptionService;

pub mod error;
pub mod subscription_service;

pub struct Services {
    pub subscription: Arc<SubscriptionService>,
}

impl Services {
    pub fn new(repo: Arc<Repository>, platform: Arc<dyn StreamPlatform>) -> Self {
        Self {
            subscription: Arc::new(SubscriptionService::new(repo, platform)),
        }
    }
}
