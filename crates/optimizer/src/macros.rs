//! Macros for dispatching over `TensorData` variants
//!
//! Kernels are written as generic functions; these macros expand one match arm per
//! element type so each arm instantiates the kernel for its concrete `Vec<T>`.

/// Match a single `TensorData` against a list of variants
///
/// Each listed variant binds its vector to `$v` and wraps `$body` back into the same
/// variant. Remaining variants fall through to the `$other => $fallback` arms.
macro_rules! match_variants {
    ($data:expr; $($variant:ident),+; $v:ident => $body:expr; $($other:pat => $fallback:expr),*) => {
        match $data {
            $(
                $crate::tensor::TensorData::$variant($v) => $crate::tensor::TensorData::$variant($body),
            )+
            $(
                $other => $fallback,
            )*
        }
    };
}

/// Apply an expression to every element type, including `bool`
macro_rules! map_any {
    ($data:expr, $v:ident => $body:expr) => {
        match_variants!($data; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Bool; $v => $body;)
    };
}

/// Apply an expression to every numeric element type
macro_rules! map_numeric {
    ($data:expr, $v:ident => $body:expr, $other:pat => $fallback:expr) => {
        match_variants!($data; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64; $v => $body; $other => $fallback)
    };
}

/// Apply an expression to signed numeric element types
macro_rules! map_signed {
    ($data:expr, $v:ident => $body:expr, $other:pat => $fallback:expr) => {
        match_variants!($data; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64; $v => $body; $other => $fallback)
    };
}

/// Apply an expression to floating point element types
macro_rules! map_float {
    ($data:expr, $v:ident => $body:expr, $other:pat => $fallback:expr) => {
        match_variants!($data; Float, Double, Float16, Bfloat16; $v => $body; $other => $fallback)
    };
}

/// Match a pair of `TensorData` values of the same element type
///
/// `same` wraps the result back into the shared variant, any other identifier names a
/// fixed output variant (e.g. `Bool` for comparisons).
macro_rules! zip_variants {
    (@wrap same, $variant:ident, $e:expr) => {
        $crate::tensor::TensorData::$variant($e)
    };
    (@wrap $fixed:ident, $variant:ident, $e:expr) => {
        $crate::tensor::TensorData::$fixed($e)
    };
    ($out:ident; $lhs:expr, $rhs:expr; $($variant:ident),+; $a:ident, $b:ident => $body:expr; $other:pat => $fallback:expr) => {
        match ($lhs, $rhs) {
            $(
                ($crate::tensor::TensorData::$variant($a), $crate::tensor::TensorData::$variant($b)) => {
                    zip_variants!(@wrap $out, $variant, $body)
                }
            )+
            $other => $fallback,
        }
    };
}

/// Combine two numeric tensors of the same element type into the same type
macro_rules! zip_numeric {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, $other:pat => $fallback:expr) => {
        zip_variants!(same; $lhs, $rhs; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64; $a, $b => $body; $other => $fallback)
    };
}

/// Combine two tensors of the same element type (including `bool`) into the same type
macro_rules! zip_any {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, $other:pat => $fallback:expr) => {
        zip_variants!(same; $lhs, $rhs; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Bool; $a, $b => $body; $other => $fallback)
    };
}

/// Compare two tensors of the same element type, producing `bool` data
macro_rules! zip_compare {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, $other:pat => $fallback:expr) => {
        zip_variants!(Bool; $lhs, $rhs; Float, Double, Float16, Bfloat16, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Bool; $a, $b => $body; $other => $fallback)
    };
}
