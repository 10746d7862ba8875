pub mod geolocation;
pub mod notifications;

pub use geolocation::{LocationProvider, StoreLocationProvider};
pub use notifications::{LogNotifier, Notifier, NotifyError, PushNotifier};
