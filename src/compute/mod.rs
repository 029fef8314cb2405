pub mod client;
pub mod quota_classes;
pub mod quotas;
pub mod response;
pub mod xml;

pub use client::{RawResponse, RestClient};
pub use quota_classes::QuotaClassesClient;
pub use quotas::{QuotaSetUpdate, QuotasClient};
pub use response::{ApiResponse, QuotaSet, format_quota};
pub use xml::{Document, Element, Value, XMLNS_11};
