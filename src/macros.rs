//! Declarative record and enum declaration.
//!
//! These stand in for the annotation layer of the source host: a field's
//! wire name and emit order, the ignore flag, and the type-level
//! key-interning override are all declared at the definition site and
//! compiled straight into the type's descriptor.

/// Declares a record type: the struct itself, its
/// [`Record`](crate::bind::Record) implementation with a cached
/// descriptor, and a [`FieldType`](crate::bind::FieldType) implementation
/// so records nest.
///
/// Field forms:
///
/// ```ignore
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct User {
///         name: String,                 // wire name "name", order 0
///         age ("Age"): i32,             // wire name override
///         city ("City", 2): String,     // wire name + emit order
///         scratch (ignore): u64,        // excluded both directions
///     }
/// }
/// ```
///
/// `pub struct User [no_intern] { .. }` pins the type to inline key
/// strings regardless of the writer's options.
#[macro_export]
macro_rules! record {
    (@impl ($(#[$meta:meta])*) ($vis:vis) $name:ident ($intern:expr) {
        $( $f:ident $( ( $($cfg:tt)+ ) )? : $fty:ty ),+ $(,)?
    }) => {
        $(#[$meta])*
        $vis struct $name {
            $( pub $f : $fty, )+
        }

        impl $crate::bind::Record for $name {
            fn descriptor() -> &'static $crate::bind::TypeDescriptor<Self> {
                static DESC: ::std::sync::LazyLock<$crate::bind::TypeDescriptor<$name>> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::bind::TypeDescriptor::with_interning(
                            ::std::vec![
                                $( $crate::__record_field!($name, $f, $fty $(, $($cfg)+ )?) ),+
                            ],
                            $intern,
                        )
                    });
                &DESC
            }
        }

        impl $crate::bind::FieldType for $name {
            fn accepts(ty: $crate::WireType) -> bool {
                ::core::matches!(ty, $crate::WireType::Map)
            }

            fn to_value(&self) -> $crate::Value {
                $crate::bind::record_to_value(self)
            }

            fn from_value(value: $crate::Value) -> ::core::option::Option<Self> {
                match value {
                    $crate::Value::Map(pairs) => {
                        ::core::option::Option::Some($crate::bind::record_from_pairs(pairs))
                    }
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident [no_intern] { $($body:tt)+ }
    ) => {
        $crate::record!(@impl ($(#[$meta])*) ($vis) $name (::core::option::Option::Some(false)) { $($body)+ });
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $($body:tt)+ }
    ) => {
        $crate::record!(@impl ($(#[$meta])*) ($vis) $name (::core::option::Option::None) { $($body)+ });
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_field {
    ($name:ident, $f:ident, $fty:ty) => {
        $crate::__record_field!(@make $name, $f, $fty, ::core::stringify!($f), 0, false)
    };
    ($name:ident, $f:ident, $fty:ty, ignore) => {
        $crate::__record_field!(@make $name, $f, $fty, ::core::stringify!($f), 0, true)
    };
    ($name:ident, $f:ident, $fty:ty, $wire:literal) => {
        $crate::__record_field!(@make $name, $f, $fty, $wire, 0, false)
    };
    ($name:ident, $f:ident, $fty:ty, $wire:literal, $order:expr) => {
        $crate::__record_field!(@make $name, $f, $fty, $wire, $order, false)
    };
    (@make $name:ident, $f:ident, $fty:ty, $wire:expr, $order:expr, $ignored:expr) => {
        $crate::bind::FieldDescriptor {
            name: $wire,
            order: $order,
            ignored: $ignored,
            get: |record: &$name| $crate::bind::FieldType::to_value(&record.$f),
            set: |record: &mut $name, value: $crate::Value| {
                if let ::core::option::Option::Some(v) =
                    <$fty as $crate::bind::FieldType>::from_value(value)
                {
                    record.$f = v;
                }
            },
            accepts: <$fty as $crate::bind::FieldType>::accepts,
        }
    };
}

/// Declares an enum that rides the wire as its ordinal (an int64).
///
/// ```ignore
/// wire_enum! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub enum Color {
///         #[default]
///         Red = 0,
///         Green = 1,
///     }
/// }
/// ```
///
/// Decoding an ordinal with no matching variant leaves the field at its
/// default, like any other mismatched value.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $ordinal:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $ordinal, )+
        }

        impl $crate::bind::FieldType for $name {
            fn accepts(ty: $crate::WireType) -> bool {
                ::core::matches!(ty, $crate::WireType::Integer)
            }

            fn to_value(&self) -> $crate::Value {
                match self {
                    $( Self::$variant => $crate::Value::Int($ordinal), )+
                }
            }

            fn from_value(value: $crate::Value) -> ::core::option::Option<Self> {
                match value.as_int()? {
                    $( $ordinal => ::core::option::Option::Some(Self::$variant), )+
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}
