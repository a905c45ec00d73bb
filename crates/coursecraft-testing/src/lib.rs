//! Test doubles for code that depends on `coursecraft-llm` without
//! wanting a real provider behind it.

mod mock_provider;

pub use mock_provider::{MockHandler, MockProvider};

pub mod prelude {
    pub use crate::MockProvider;
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecraft_llm::Provider as _;

    #[test]
    fn prelude_mock_provider_is_usable() {
        use crate::prelude::MockProvider as PreludeMockProvider;
        let provider = PreludeMockProvider::new("prelude_test");
        assert_eq!(provider.name(), "prelude_test");
    }
}
