mod helpers;
mod mocks;
mod notifications;
mod orders;
