//! Field numbers of `google/protobuf/descriptor.proto`, used to build
//! source-info paths.

pub(crate) mod file {
    pub(crate) const MESSAGE_TYPE: i32 = 4;
    pub(crate) const ENUM_TYPE: i32 = 5;
    pub(crate) const SERVICE: i32 = 6;
    pub(crate) const EXTENSION: i32 = 7;
    pub(crate) const OPTIONS: i32 = 8;
}

pub(crate) mod message {
    pub(crate) const FIELD: i32 = 2;
    pub(crate) const NESTED_TYPE: i32 = 3;
    pub(crate) const ENUM_TYPE: i32 = 4;
    pub(crate) const EXTENSION_RANGE: i32 = 5;
    pub(crate) const EXTENSION: i32 = 6;
    pub(crate) const OPTIONS: i32 = 7;
    pub(crate) const ONEOF_DECL: i32 = 8;
}

pub(crate) mod field {
    pub(crate) const DEFAULT_VALUE: i32 = 7;
    pub(crate) const OPTIONS: i32 = 8;
    pub(crate) const JSON_NAME: i32 = 10;
}

pub(crate) mod oneof {
    pub(crate) const OPTIONS: i32 = 2;
}

pub(crate) mod enum_ {
    pub(crate) const VALUE: i32 = 2;
    pub(crate) const OPTIONS: i32 = 3;
}

pub(crate) mod enum_value {
    pub(crate) const OPTIONS: i32 = 3;
}

pub(crate) mod service {
    pub(crate) const METHOD: i32 = 2;
    pub(crate) const OPTIONS: i32 = 3;
}

pub(crate) mod method {
    pub(crate) const OPTIONS: i32 = 4;
}

pub(crate) mod extension_range {
    pub(crate) const OPTIONS: i32 = 3;
}

/// Tags of option fields consulted directly by the interpreter.
pub(crate) mod options {
    pub(crate) const UNINTERPRETED: i32 = 999;

    /// `features` fields consulted directly (map propagation and enum
    /// openness).
    pub(crate) mod features {
        pub(crate) const FILE: i32 = 50;
        pub(crate) const FIELD: i32 = 21;
        pub(crate) const ENUM: i32 = 7;
    }

    pub(crate) mod message {
        pub(crate) const MESSAGE_SET_WIRE_FORMAT: i32 = 1;
        pub(crate) const MAP_ENTRY: i32 = 7;
    }

    pub(crate) mod field {
        pub(crate) const TARGETS: i32 = 19;
        pub(crate) const FEATURE_SUPPORT: i32 = 22;
    }

    pub(crate) mod enum_value {
        pub(crate) const FEATURE_SUPPORT: i32 = 4;
    }

    pub(crate) mod feature_support {
        pub(crate) const EDITION_INTRODUCED: i32 = 1;
        pub(crate) const EDITION_DEPRECATED: i32 = 2;
        pub(crate) const DEPRECATION_WARNING: i32 = 3;
        pub(crate) const EDITION_REMOVED: i32 = 4;
    }

    pub(crate) mod feature_set {
        pub(crate) const ENUM_TYPE: i32 = 2;
    }
}
