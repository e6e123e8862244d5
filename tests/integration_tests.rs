use serde::{Deserialize, Serialize};
use serde_ltsv::{
    from_reader, from_str, impl_record, map_to_string, text_field, to_string, to_writer,
    unmarshal, unmarshal_map, unmarshal_str, BoxError, Encoder, Error, FieldDescriptor,
    FieldError, FieldType, FromText, LtsvMap, PlanCache, Record, TextDomain, ToText,
};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, PartialEq)]
struct Profile {
    user: String,
    age: u8,
    height: Option<f64>,
    weight: f32,
}

impl_record!(Profile {
    user,
    age,
    height,
    weight,
});

#[derive(Debug, Default, PartialEq)]
struct TaggedProfile {
    user: String,
    age: u8,
    height: f64,
    weight: f32,
    memo: String,
}

impl_record!(TaggedProfile {
    user => "user",
    age => "age",
    height => "height",
    weight,
    memo => "-",
});

#[derive(Debug, Default, PartialEq)]
struct Access {
    time: String,
    host: Option<IpAddr>,
    req: String,
    status: u16,
    size: u64,
    ua: String,
    req_time: Option<f64>,
    upstream_time: Option<f64>,
}

impl_record!(Access {
    time,
    host,
    req,
    status,
    size,
    ua,
    req_time => "reqtime",
    upstream_time => "upstream_time,omitempty",
});

#[test]
fn test_decode_full_profile() {
    let profile: Profile = from_str("user:songmu\tage:36\theight:169.1\tweight:66.6").unwrap();
    assert_eq!(
        profile,
        Profile {
            user: "songmu".to_string(),
            age: 36,
            height: Some(169.1),
            weight: 66.6,
        }
    );
}

#[test]
fn test_decode_missing_keys() {
    let profile: Profile = from_str("user:songmu\tage:36").unwrap();
    assert_eq!(
        profile,
        Profile {
            user: "songmu".to_string(),
            age: 36,
            height: None,
            weight: 0.0,
        }
    );
}

#[test]
fn test_decode_invalid_numbers() {
    let mut profile = Profile::default();
    let err = unmarshal_str("user:songmu\tage:-\theight:-", &mut profile).unwrap_err();

    assert_eq!(
        profile,
        Profile {
            user: "songmu".to_string(),
            ..Profile::default()
        }
    );

    let errors = err.fields().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.of_field("age").is_some());
    assert!(errors.of_field("height").is_some());
    assert!(errors.of_field("user").is_none());
    println!("Aggregate error:\n{}", err);
}

#[test]
fn test_decode_ignores_unknown_labels() {
    let profile: Profile = from_str("user:songmu\tcountry:jp\tage:36").unwrap();
    assert_eq!(profile.user, "songmu");
    assert_eq!(profile.age, 36);
}

#[test]
fn test_decode_into_existing_values() {
    let mut profile = Profile {
        user: "before".to_string(),
        age: 1,
        height: Some(1.0),
        weight: 1.0,
    };
    unmarshal(b"age:2", &mut profile).unwrap();
    assert_eq!(profile.user, "before");
    assert_eq!(profile.age, 2);
    assert_eq!(profile.height, Some(1.0));
}

#[test]
fn test_excluded_field_in_both_directions() {
    let mut profile = TaggedProfile {
        memo: "keep".to_string(),
        ..TaggedProfile::default()
    };
    unmarshal_str("user:songmu\tmemo:overwritten\t-:x", &mut profile).unwrap();
    assert_eq!(profile.memo, "keep");

    let profile = TaggedProfile {
        user: "songmu".to_string(),
        age: 36,
        height: 169.1,
        weight: 66.6,
        memo: "songmu.jp".to_string(),
    };
    assert_eq!(
        to_string(&profile).unwrap(),
        "user:songmu\tage:36\theight:169.1\tweight:66.6"
    );
}

#[test]
fn test_access_log_line() {
    let line = "time:[28/Feb/2013:12:00:00 +0900]\thost:192.168.0.1\t\
                req:GET /list HTTP/1.1\tstatus:200\tsize:5316\t\
                ua:Mozilla/5.0\treqtime:0.030\tupstream_time:0.029";

    let access: Access = from_str(line).unwrap();
    assert_eq!(access.time, "[28/Feb/2013:12:00:00 +0900]");
    assert_eq!(access.host, Some("192.168.0.1".parse().unwrap()));
    assert_eq!(access.req, "GET /list HTTP/1.1");
    assert_eq!(access.status, 200);
    assert_eq!(access.size, 5316);
    assert_eq!(access.req_time, Some(0.03));
    assert_eq!(access.upstream_time, Some(0.029));

    let back = to_string(&access).unwrap();
    let again: Access = from_str(&back).unwrap();
    assert_eq!(access, again);
}

#[test]
fn test_custom_field_error_is_kept_verbatim() {
    let mut access = Access::default();
    let err = unmarshal_str("host:not-an-ip\tstatus:204", &mut access).unwrap_err();

    assert_eq!(access.status, 204);
    assert_eq!(access.host, None);
    let field_err = err.fields().unwrap().of_field("host").unwrap();
    assert!(matches!(field_err, FieldError::Text(_)));
    assert_eq!(
        field_err.to_string(),
        "not-an-ip".parse::<IpAddr>().unwrap_err().to_string()
    );
}

#[derive(Debug, Default, PartialEq)]
struct Upper(String);

impl FromText for Upper {
    fn from_text(text: &[u8]) -> Result<Self, BoxError> {
        Ok(Upper(std::str::from_utf8(text)?.to_uppercase()))
    }
}

impl ToText for Upper {
    fn to_text(&self) -> Result<Vec<u8>, BoxError> {
        if self.0.is_empty() {
            return Err("empty".into());
        }
        Ok(self.0.to_lowercase().into_bytes())
    }
}

text_field!(Upper);

#[derive(Debug, Default)]
struct WriteOnly(u32);

impl ToText for WriteOnly {
    fn to_text(&self) -> Result<Vec<u8>, BoxError> {
        Ok(format!("#{}", self.0).into_bytes())
    }
}

text_field!(WriteOnly: to);

#[derive(Debug, Default)]
struct Custom {
    name: Upper,
    id: WriteOnly,
    note: Option<Upper>,
}

impl_record!(Custom { name, id, note });

#[test]
fn test_custom_capabilities() {
    let mut custom = Custom::default();
    let err = unmarshal_str("name:alice\tid:7\tnote:hi", &mut custom).unwrap_err();

    assert_eq!(custom.name, Upper("ALICE".to_string()));
    assert_eq!(custom.note, Some(Upper("HI".to_string())));
    let errors = err.fields().unwrap();
    assert_eq!(errors.names().collect::<Vec<_>>(), vec!["id"]);
    assert!(matches!(
        errors.of_field("id"),
        Some(FieldError::Unmarshal { .. })
    ));

    custom.id = WriteOnly(7);
    assert_eq!(to_string(&custom).unwrap(), "name:alice\tid:#7\tnote:hi");
}

#[test]
fn test_custom_encode_failure_keeps_siblings() {
    let custom = Custom {
        name: Upper(String::new()),
        id: WriteOnly(1),
        note: None,
    };

    let mut buffer = Vec::new();
    let err = to_writer(&mut buffer, &custom).unwrap_err();
    assert_eq!(buffer, b"id:#1");

    let field_err = err.fields().unwrap().of_field("name").unwrap();
    assert_eq!(field_err.to_string(), "empty");
    assert_eq!(field_err.text_error().unwrap().to_string(), "empty");
}

#[test]
fn test_opaque_field_in_both_directions() {
    #[derive(Default)]
    struct Blob;
    impl FieldType for Blob {
        fn type_name() -> &'static str {
            "Blob"
        }
    }

    #[derive(Default)]
    struct Holder {
        blob: Blob,
        n: i32,
    }
    impl_record!(Holder { blob, n });

    let mut holder = Holder::default();
    let err = unmarshal_str("blob:xyz\tn:-5", &mut holder).unwrap_err();
    assert_eq!(holder.n, -5);
    assert_eq!(
        err.fields().unwrap().of_field("blob").unwrap().to_string(),
        "ltsv: cannot unmarshal xyz into value of type Blob"
    );

    let mut out = Vec::new();
    let err = Encoder::new().encode(&holder, &mut out).unwrap_err();
    assert_eq!(out, b"n:-5");
    assert_eq!(
        err.fields().unwrap().of_field("blob").unwrap().to_string(),
        "ltsv: failed to marshal type: Blob"
    );
}

#[test]
fn test_malformed_input() {
    let mut profile = Profile::default();
    let err = unmarshal_str("user:songmu\tage", &mut profile).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
    assert!(err.fields().is_none());
    assert_eq!(err.to_string(), "not a ltsv: user:songmu\tage");
    assert_eq!(profile, Profile::default());
}

#[test]
fn test_map_targets() {
    let input = b"hoge: fuga\tpiyo: piyo";

    let mut hash: HashMap<String, String> = HashMap::new();
    unmarshal_map(input, &mut hash).unwrap();
    assert_eq!(hash.len(), 2);
    assert_eq!(hash["hoge"], "fuga");

    let mut tree: BTreeMap<String, String> = BTreeMap::new();
    unmarshal_map(input, &mut tree).unwrap();
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["hoge", "piyo"]);

    let mut ordered = LtsvMap::new();
    unmarshal_map(input, &mut ordered).unwrap();
    assert_eq!(ordered.get("piyo"), Some("piyo"));
}

#[test]
fn test_map_duplicate_label_last_wins() {
    let mut map: HashMap<String, String> = HashMap::new();
    unmarshal_map(b"a:1\ta:2", &mut map).unwrap();
    assert_eq!(map["a"], "2");

    let mut profile = Profile::default();
    unmarshal_str("age:1\tage:2", &mut profile).unwrap();
    assert_eq!(profile.age, 2);
}

#[test]
fn test_encode_map() {
    let mut data = HashMap::new();
    data.insert("hoge", "fuga");
    data.insert("piyo", "piyo");

    let ltsv = map_to_string(&data).unwrap();
    assert!(ltsv == "hoge:fuga\tpiyo:piyo" || ltsv == "piyo:piyo\thoge:fuga");

    let ordered = LtsvMap::parse("b:2\ta:1").unwrap();
    assert_eq!(map_to_string(&ordered).unwrap(), "b:2\ta:1");
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
struct Label(String);
impl TextDomain for Label {}

#[test]
fn test_map_of_text_newtypes() {
    let mut map: BTreeMap<Label, Label> = BTreeMap::new();
    unmarshal_map(b"host:10.0.0.1\tua:curl", &mut map).unwrap();
    assert_eq!(
        map.get(&Label("host".to_string())),
        Some(&Label("10.0.0.1".to_string()))
    );
    assert_eq!(map_to_string(&map).unwrap(), "host:10.0.0.1\tua:curl");
}

static HIT_FIELDS_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Hit {
    status: u16,
}

impl Record for Hit {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        HIT_FIELDS_CALLS.fetch_add(1, Ordering::SeqCst);
        vec![FieldDescriptor::new(
            "status",
            "",
            |hit: &Self| &hit.status,
            |hit: &mut Self| &mut hit.status,
        )]
    }
}

#[test]
fn test_repeated_unmarshal_resolves_fields_once() {
    let mut hit = Hit::default();
    for line in ["status:200", "status:404", "status:500"] {
        unmarshal_str(line, &mut hit).unwrap();
    }
    assert_eq!(hit.status, 500);
    assert_eq!(HIT_FIELDS_CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsigned_rejects_plus_sign() {
    let mut profile = Profile::default();
    let err = unmarshal_str("age:+36", &mut profile).unwrap_err();
    assert_eq!(
        err.fields().unwrap().of_field("age").unwrap().to_string(),
        "ltsv: cannot unmarshal number +36 into value of type u8"
    );
    assert_eq!(profile.age, 0);
}

#[test]
fn test_from_reader_invalid_utf8_is_malformed() {
    let err = from_reader::<_, Profile>(&b"user:\xff\xfe"[..]).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
}

#[test]
fn test_encoder_with_private_cache() {
    let cache = Arc::new(PlanCache::new());
    let encoder = Encoder::with_cache(Arc::clone(&cache));

    let profile = Profile {
        user: "songmu".to_string(),
        age: 36,
        height: None,
        weight: 66.5,
    };
    let mut first = Vec::new();
    encoder.encode(&profile, &mut first).unwrap();
    let mut second = Vec::new();
    encoder.encode(&profile, &mut second).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, b"user:songmu\tage:36\tweight:66.5");
    assert_eq!(cache.len(), 1);
    assert!(cache.contains::<Profile>());
    assert!(!cache.contains::<Access>());
}

#[test]
fn test_encoder_appends_to_buffer() {
    let encoder = Encoder::new();
    let mut out = b"prefix ".to_vec();
    encoder
        .encode(
            &Profile {
                user: "a".to_string(),
                ..Profile::default()
            },
            &mut out,
        )
        .unwrap();
    assert_eq!(out, b"prefix user:a\tage:0\tweight:0");
}
