/// Implements [`Record`](crate::Record) for a struct.
///
/// Each field is listed by name, optionally followed by `=> "tag"`:
///
/// - no tag: the label is the field name in lowercase;
/// - `=> "label"`: the label is `label` (anything after a comma is ignored);
/// - `=> "-"`: the field is never read or written.
///
/// Fields not listed are ignored as well. Every listed field's type must
/// implement [`FieldType`](crate::FieldType).
///
/// # Examples
///
/// ```rust
/// use serde_ltsv::{impl_record, to_string};
///
/// struct Access {
///     host: String,
///     req_time: Option<f64>,
///     status: u16,
///     internal: u64,
/// }
///
/// impl_record!(Access {
///     host,
///     req_time => "reqtime",
///     status,
///     internal => "-",
/// });
///
/// let access = Access {
///     host: "127.0.0.1".to_string(),
///     req_time: Some(0.05),
///     status: 200,
///     internal: 7,
/// };
/// assert_eq!(to_string(&access).unwrap(), "host:127.0.0.1\treqtime:0.05\tstatus:200");
/// ```
#[macro_export]
macro_rules! impl_record {
    (@tag) => {
        ""
    };
    (@tag $tag:literal) => {
        $tag
    };
    ($ty:ty { $($field:ident $(=> $tag:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> ::std::vec::Vec<$crate::FieldDescriptor<Self>> {
                ::std::vec![
                    $(
                        $crate::FieldDescriptor::new(
                            ::std::stringify!($field),
                            $crate::impl_record!(@tag $($tag)?),
                            |record: &Self| &record.$field,
                            |record: &mut Self| &mut record.$field,
                        ),
                    )*
                ]
            }
        }
    };
}
