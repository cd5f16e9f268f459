use lib::Item;
use std::io;
use std::str::FromStr;

/// How items are written on stdin, one per line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// `<priority> <payload>`
    Plain,
    /// `{"priority": <priority>, "payload": "<payload>"}`
    Json,
}

impl Default for InputFormat {
    fn default() -> Self {
        InputFormat::Plain
    }
}

impl FromStr for InputFormat {
    type Err = io::Error;

    fn from_str(s: &str) -> io::Result<Self> {
        match s {
            "plain" => Ok(InputFormat::Plain),
            "json" => Ok(InputFormat::Json),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported input format: {}", s),
            )),
        }
    }
}

pub fn parse_item(line: &str, format: InputFormat) -> io::Result<Item> {
    match format {
        InputFormat::Plain => line.parse(),
        InputFormat::Json => serde_json::from_str(line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

pub fn validate_capacity(s: String) -> Result<(), String> {
    match usize::from_str(&s) {
        Ok(n) if n <= lib::settings::MAX_CHANNEL_CAPACITY => Ok(()),
        Ok(_) => Err(format!(
            "Capacity can't be greater than {}",
            lib::settings::MAX_CHANNEL_CAPACITY
        )),
        Err(_) => Err("Can't parse a capacity value".into()),
    }
}

#[test]
fn test_parse_item() {
    let tests = [
        ("3 a", InputFormat::Plain, Some(Item::new(3, "a"))),
        ("-1 two words", InputFormat::Plain, Some(Item::new(-1, "two words"))),
        ("a 3", InputFormat::Plain, None),
        (
            r#"{"priority": 9, "payload": "b"}"#,
            InputFormat::Json,
            Some(Item::new(9, "b")),
        ),
        ("9 b", InputFormat::Json, None),
        (r#"{"priority": "9", "payload": "b"}"#, InputFormat::Json, None),
    ];

    for test in &tests {
        let result = parse_item(test.0, test.1).ok();
        if result != test.2 {
            panic!("{:?}: expected {:?}, got {:?}", test.0, test.2, result);
        }
    }
}

#[test]
fn test_input_format() {
    assert_eq!("plain".parse::<InputFormat>().unwrap(), InputFormat::Plain);
    assert_eq!("json".parse::<InputFormat>().unwrap(), InputFormat::Json);
    assert_eq!(
        "yaml".parse::<InputFormat>().unwrap_err().kind(),
        io::ErrorKind::InvalidInput
    );
}

#[test]
fn test_validate_capacity() {
    assert!(validate_capacity("0".into()).is_ok());
    assert!(validate_capacity("128".into()).is_ok());
    assert!(validate_capacity("-1".into()).is_err());
    assert!(validate_capacity("lots".into()).is_err());
    assert!(validate_capacity(
        (lib::settings::MAX_CHANNEL_CAPACITY + 1).to_string()
    )
    .is_err());
}
