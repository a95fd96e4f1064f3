//! Leveled assertions which check the internal invariants of the network maintenance.
//!
//! Simple assertions are cheap and always enabled. The more expensive levels are only enabled
//! in tests or when the `debug-checks` feature is turned on.

#[cfg(all(not(test), not(feature = "debug-checks")))]
pub const NETFLOW_ASSERT_LEVEL_DEFINITION: u8 = NETFLOW_ASSERT_SIMPLE;

#[cfg(any(test, feature = "debug-checks"))]
pub const NETFLOW_ASSERT_LEVEL_DEFINITION: u8 = NETFLOW_ASSERT_ADVANCED;

pub const NETFLOW_ASSERT_SIMPLE: u8 = 1;
pub const NETFLOW_ASSERT_MODERATE: u8 = 2;
pub const NETFLOW_ASSERT_ADVANCED: u8 = 3;

#[macro_export]
#[doc(hidden)]
macro_rules! netflow_assert_simple {
    ($($arg:tt)*) => {
        if $crate::asserts::NETFLOW_ASSERT_LEVEL_DEFINITION >= $crate::asserts::NETFLOW_ASSERT_SIMPLE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! netflow_assert_eq_simple {
    ($($arg:tt)*) => {
        if $crate::asserts::NETFLOW_ASSERT_LEVEL_DEFINITION >= $crate::asserts::NETFLOW_ASSERT_SIMPLE {
            assert_eq!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! netflow_assert_moderate {
    ($($arg:tt)*) => {
        if $crate::asserts::NETFLOW_ASSERT_LEVEL_DEFINITION >= $crate::asserts::NETFLOW_ASSERT_MODERATE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! netflow_assert_advanced {
    ($($arg:tt)*) => {
        if $crate::asserts::NETFLOW_ASSERT_LEVEL_DEFINITION >= $crate::asserts::NETFLOW_ASSERT_ADVANCED {
            assert!($($arg)*);
        }
    };
}
