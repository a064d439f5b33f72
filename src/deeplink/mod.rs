//! Deep links returned by the external checkout provider.
//!
//! URIs are classified into [`NavigationIntent`]s by a pure string-matching
//! policy; nothing here touches the network or the persistent slot.
//!
//! # Example
//!
//! ```
//! use payment_reconciler::deeplink::{DeepLinkMarkers, NavigationIntent, classify};
//!
//! let markers = DeepLinkMarkers::default();
//! let intent = classify("myapp://checkout/cancel?orderId=order123", &markers);
//! assert!(matches!(intent, NavigationIntent::Cancel { .. }));
//! assert_eq!(intent.order_id().unwrap().as_str(), "order123");
//!
//! assert_eq!(classify("myapp://profile", &markers), NavigationIntent::Ignored);
//! ```

mod intent;
mod parser;
mod source;

pub use intent::{NavigationIntent, QueryParams};
pub use parser::{DeepLinkMarkers, DeepLinkParseError, classify, parse_deep_link};
pub use source::{DeepLinkFeed, DeepLinkSource};
