// Application state for HTTP handlers
use crate::application::contact_service::ContactService;
use crate::application::news_service::NewsService;
use crate::application::profile_service::ProfileService;
use crate::application::session_service::SessionService;
use crate::application::trekking_service::TrekkingService;
use crate::infrastructure::device_outbox::DeviceOutbox;
use crate::infrastructure::sensor_hub::SensorHub;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SensorHub>,
    pub outbox: Arc<DeviceOutbox>,
    pub sessions: SessionService,
    pub contacts: ContactService,
    pub trekking: TrekkingService,
    pub news: NewsService,
    pub profiles: ProfileService,
}
