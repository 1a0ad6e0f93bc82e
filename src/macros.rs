/// Error context macro.
///
/// Attaches `file:line` and debug dumps of the arguments after `=>` to an error,
/// then wraps it into the chain of contexts (usually `ErrorSource`, `ErrorContext`, `ErrorKind`).
///
/// - `ectx!(err e, ctx1, ctx2 => arg1, arg2)` - wrap the error `e`, convert with `into`
/// - `ectx!(try err e, ...)` - same, but the result is the local `Error` type (useful with `?`)
/// - `ectx!(convert err e, ...)` - additionally use `e.kind().into()` as the last context
/// - `ectx!(ctx1, ctx2 => arg1)` - closure version of `err` for `map_err`
/// - `ectx!(try ctx1 => arg1)`, `ectx!(convert => arg1)`, `ectx!(try convert => arg1)` - closure versions
macro_rules! ectx {
    (err_contexts $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let mut msg = "at ".to_string();
        msg.push_str(&format!("{}:{}", file!(), line!()));
        $(
            $(
                let arg = format!("\nwith args - {}: {:#?}", stringify!($arg), $arg);
                msg.push_str(&arg);
            )*
        )*
        let err = $e.context(msg);
        $(
            let err = err.context($context);
        )*
        err
    }};

    (err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let err = ectx!(err_contexts $e $(,$context)* $(=> $($arg),*)*);
        err.into()
    }};

    (try err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let err: Error = ectx!(err $e $(,$context)* $(=> $($arg),*)*);
        err
    }};

    (convert err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let kind: ErrorKind = $e.kind().into();
        ectx!(err $e $(,$context)*, kind $(=> $($arg),*)*)
    }};

    (try convert err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let kind: ErrorKind = $e.kind().into();
        ectx!(try err $e $(,$context)*, kind $(=> $($arg),*)*)
    }};

    (raw_err $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(err_contexts e $(,$context)* $(=> $($arg),*)*)
        }
    }};

    (try convert $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(try convert err e $(,$context)* $(=> $($arg),*)*)
        }
    }};

    (convert $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(convert err e $(,$context)* $(=> $($arg),*)*)
        }
    }};

    (try $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(try err e $(,$context)* $(=> $($arg),*)*)
        }
    }};

    ($($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(err e $(,$context)* $(=> $($arg),*)*)
        }
    }};
}

/// Boilerplate for `Error { inner: Context<ErrorKind> }` error types.
/// Expects `Fail`, `Backtrace`, `Context`, `Display` and `fmt` in scope.
macro_rules! derive_error_impls {
    () => {
        impl Fail for Error {
            fn cause(&self) -> Option<&Fail> {
                self.inner.cause()
            }

            fn backtrace(&self) -> Option<&Backtrace> {
                self.inner.backtrace()
            }
        }

        impl Display for Error {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                Display::fmt(&self.inner, f)
            }
        }

        impl From<ErrorKind> for Error {
            fn from(kind: ErrorKind) -> Error {
                Error { inner: Context::new(kind) }
            }
        }

        impl From<Context<ErrorKind>> for Error {
            fn from(inner: Context<ErrorKind>) -> Error {
                Error { inner: inner }
            }
        }

        #[allow(dead_code)]
        impl Error {
            pub fn kind(&self) -> ErrorKind {
                self.inner.get_context().clone()
            }
        }
    };
}

/// Postgres `FromSql` / `ToSql` for a single field newtype.
macro_rules! derive_newtype_sql {
    ($mod_name:ident, $sql_type:ty, $type:ty, $constructor:expr) => {
        mod $mod_name {
            use super::*;
            use diesel::deserialize::{self, FromSql};
            use diesel::pg::Pg;
            use diesel::serialize::{self, Output, ToSql};
            use std::io::Write;

            impl FromSql<$sql_type, Pg> for $type {
                fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
                    FromSql::<$sql_type, Pg>::from_sql(data).map($constructor)
                }
            }

            impl ToSql<$sql_type, Pg> for $type {
                fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                    ToSql::<$sql_type, Pg>::to_sql(&self.0, out)
                }
            }
        }
    };
}
