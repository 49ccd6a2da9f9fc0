//! Resource declaration macro
//!
//! [`resource!`](crate::resource!) turns a compact schema declaration into a
//! full resource type: the static [`Schema`](crate::model::Schema), the
//! [`Resource`](crate::model::Resource) impl, typed getters and setters per
//! attribute, and one proxy accessor per relationship.

/// Declare a JSON:API resource type.
///
/// Each attribute maps a Rust field name to its wire name. Attributes are
/// writable by default; `[create_only]` makes them immutable after creation
/// and `[readonly]` drops the setter entirely. Relationships declare their
/// cardinality (`one` or `many`), target type and wire name.
///
/// ```
/// vilocify::resource! {
///     pub struct Widget: "widgets" {
///         attrs {
///             name: String => "name",
///             serial: String => "serialNumber" [create_only],
///             created_at: String => "createdAt" [readonly],
///         }
///     }
/// }
///
/// let widget = Widget::new();
/// widget.set_name("bolt");
/// assert_eq!(widget.name().as_deref(), Some("bolt"));
/// ```
#[macro_export]
macro_rules! resource {
    (
        $(#[$meta:meta])*
        pub struct $name:ident : $type_name:literal {
            attrs {
                $( $(#[$attr_meta:meta])* $fname:ident : $fty:ty => $wire:literal $([$flag:ident])? ),* $(,)?
            }
            $(
                rels {
                    $( $card:ident $rname:ident : $target:ident => $rwire:literal ),* $(,)?
                }
            )?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            node: $crate::model::Node,
        }

        impl $crate::model::Resource for $name {
            fn schema() -> &'static $crate::model::Schema {
                static SCHEMA: $crate::model::Schema = $crate::model::Schema {
                    type_name: $type_name,
                    attributes: &[
                        $(
                            $crate::model::AttributeDef {
                                name: $wire,
                                write: $crate::__resource_write_mode!($($flag)?),
                            },
                        )*
                    ],
                    relationships: &[
                        $($(
                            $crate::model::RelationshipDef {
                                name: $rwire,
                                target: <$target as $crate::model::Resource>::schema,
                                cardinality: $crate::__resource_cardinality!($card),
                            },
                        )*)?
                    ],
                };
                &SCHEMA
            }

            fn node(&self) -> &$crate::model::Node {
                &self.node
            }

            fn from_node(node: $crate::model::Node) -> Self {
                Self { node }
            }
        }

        impl $name {
            /// Fresh unpersisted instance with nothing set.
            pub fn new() -> Self {
                <Self as $crate::model::Resource>::new()
            }

            $(
                $crate::__resource_accessors!($(#[$attr_meta])* $fname : $fty => $wire $(, $flag)?);
            )*

            $($(
                $crate::__resource_relationship!($card $rname : $target => $rwire);
            )*)?
        }

        impl ::std::clone::Clone for $name {
            /// A clone aliases the same record as the original.
            fn clone(&self) -> Self {
                Self {
                    node: self.node.clone(),
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                self.node.debug_fmt(stringify!($name), f)
            }
        }

        impl ::std::cmp::PartialEq for $name {
            /// Instances are equal when they share type, id and attributes.
            fn eq(&self, other: &Self) -> bool {
                self.node.same_identity_and_attributes(&other.node)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resource_write_mode {
    () => {
        $crate::model::WriteMode::CreateAndUpdate
    };
    (create_only) => {
        $crate::model::WriteMode::CreateOnly
    };
    (readonly) => {
        $crate::model::WriteMode::ReadOnly
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resource_cardinality {
    (one) => {
        $crate::model::Cardinality::One
    };
    (many) => {
        $crate::model::Cardinality::Many
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resource_accessors {
    ($(#[$attr_meta:meta])* $fname:ident : $fty:ty => $wire:literal, readonly) => {
        $(#[$attr_meta])*
        pub fn $fname(&self) -> ::std::option::Option<$fty> {
            $crate::model::from_json($crate::model::Resource::node(self).attribute($wire)?)
        }
    };
    ($(#[$attr_meta:meta])* $fname:ident : $fty:ty => $wire:literal $(, $flag:ident)?) => {
        $(#[$attr_meta])*
        pub fn $fname(&self) -> ::std::option::Option<$fty> {
            $crate::model::from_json($crate::model::Resource::node(self).attribute($wire)?)
        }

        $crate::paste::paste! {
            pub fn [<set_ $fname>](&self, value: impl ::std::convert::Into<$fty>) {
                $crate::model::Resource::node(self)
                    .set_attribute($wire, $crate::model::to_json(value.into()));
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __resource_relationship {
    (one $rname:ident : $target:ident => $rwire:literal) => {
        pub fn $rname(&self) -> $crate::relationship::ToOne<$target> {
            $crate::relationship::ToOne::new($crate::model::Resource::node(self).clone(), $rwire)
        }
    };
    (many $rname:ident : $target:ident => $rwire:literal) => {
        pub fn $rname(&self) -> $crate::relationship::ToMany<$target> {
            $crate::relationship::ToMany::new($crate::model::Resource::node(self).clone(), $rwire)
        }
    };
}
