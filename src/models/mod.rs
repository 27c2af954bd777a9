pub mod user;
pub mod order;
pub mod order_item;
pub mod notification;
// shipping
pub mod shipment;
pub mod shipment_event;
pub mod delivery_attempt;
pub mod cod_reconciliation;
pub mod cod_reconciliation_shipment;
// marketing
pub mod coupon;
pub mod coupon_user;
pub mod coupon_usage;
pub mod banner;
pub mod flash_sale;
pub mod flash_sale_item;
pub mod campaign;
// reviews
pub mod review;
pub mod review_image;
pub mod review_reply;
pub mod review_vote;
pub mod review_report;
pub mod review_summary;
// locations
pub mod province;
pub mod district;
pub mod ward;
// security
pub mod two_factor_config;
pub mod login_attempt;
pub mod account_lockout;
pub mod api_key;
pub mod trusted_device;
pub mod ip_blacklist;
pub mod security_audit_log;
pub mod csp_report;
// social login
pub mod oauth_provider_config;
pub mod social_connection;
pub mod oauth_state;
pub mod social_login_log;

pub use shipment::Model as Shipment;
pub use user::Model as User;
