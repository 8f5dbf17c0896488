use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::code::COMPOSITE;
use crate::codec::{decode_composite, encode_composite, CompositeMap};
use crate::error::{CodecError, Result};
use crate::frame::Frame;
use crate::message::Message;

/// A string-keyed mapping of independently encoded values.
///
/// Values stay opaque byte strings until a typed accessor attaches a concrete
/// type to them:
///
/// ```
/// use modlink_frame::CompositeMessage;
///
/// let frame = CompositeMessage::compose_default(|msg| {
///     msg.set("greeting", "Hello")?;
///     msg.set("age", &45i32)
/// })
/// .unwrap();
///
/// let mut msg: CompositeMessage = frame.decode_as().unwrap();
/// assert_eq!(msg.get::<String>("greeting").unwrap(), "Hello");
/// assert_eq!(msg.extract::<i32>("age").unwrap(), Some(45));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeMessage {
    code: i32,
    data: CompositeMap,
}

impl CompositeMessage {
    pub fn new(code: i32) -> Self {
        Self::from_map(code, CompositeMap::new())
    }

    pub fn from_map(code: i32, data: CompositeMap) -> Self {
        Self { code, data }
    }

    /// Build a message with `setup` and return its encoded form.
    pub fn compose<F>(code: i32, setup: F) -> Result<Frame>
    where
        F: FnOnce(&mut CompositeMessage) -> Result<()>,
    {
        let mut message = Self::new(code);
        setup(&mut message)?;
        message.encode()
    }

    /// [`compose`](Self::compose) with the default composite tag.
    pub fn compose_default<F>(setup: F) -> Result<Frame>
    where
        F: FnOnce(&mut CompositeMessage) -> Result<()>,
    {
        Self::compose(COMPOSITE, setup)
    }

    /// Decode the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .data
            .get(key)
            .ok_or_else(|| CodecError::FieldNotFound(key.to_string()))?;
        Ok(bincode::deserialize(bytes)?)
    }

    /// Encode `value` and store it under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.data.insert(key.into(), bytes);
        Ok(())
    }

    /// Remove the value under `key` and decode it.
    ///
    /// A missing key is `Ok(None)`, not an error.
    pub fn extract<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.data.remove(key) {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove the value under `key`, reporting whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw (still encoded) entries.
    pub fn data(&self) -> &CompositeMap {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CompositeMap {
        &mut self.data
    }

    pub fn into_data(self) -> CompositeMap {
        self.data
    }
}

impl Message for CompositeMessage {
    fn code(&self) -> i32 {
        self.code
    }

    fn encode(&self) -> Result<Frame> {
        encode_composite(&self.data, self.code)
    }

    fn decode(frame: Frame) -> Result<Self> {
        let code = frame.code();
        Ok(Self::from_map(code, decode_composite(frame)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use serde::Deserialize;

    use super::*;

    const GREETING: &str = "Hello";
    const AGE: i32 = 45;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f64,
        y: f64,
    }

    #[test]
    fn compose_then_decode_scenario() {
        let mut old_blob = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut old_blob);

        let frame = CompositeMessage::compose_default(|msg| {
            msg.set("greeting", GREETING)?;
            msg.set("age", &AGE)?;
            msg.set("blob", &old_blob.to_vec())
        })
        .unwrap();
        assert_eq!(frame.code(), COMPOSITE);

        let mut message = CompositeMessage::decode(frame).unwrap();

        let blob: Vec<u8> = message.get("blob").unwrap();
        assert_eq!(blob, old_blob);

        let greeting: String = message.get("greeting").unwrap();
        assert_eq!(greeting, GREETING);

        let age: Option<i32> = message.extract("age").unwrap();
        assert_eq!(age, Some(AGE));
        assert!(matches!(
            message.get::<i32>("age"),
            Err(CodecError::FieldNotFound(key)) if key == "age"
        ));
    }

    #[test]
    fn set_then_get_for_several_types() {
        let mut message = CompositeMessage::new(COMPOSITE);
        let position = Position { x: 1.5, y: -2.0 };

        message.set("flag", &true).unwrap();
        message.set("count", &u64::MAX).unwrap();
        message.set("name", "module").unwrap();
        message.set("tags", &vec!["a".to_string(), "b".to_string()]).unwrap();
        message.set("position", &position).unwrap();
        message.set("maybe", &Option::<i16>::None).unwrap();

        assert!(message.get::<bool>("flag").unwrap());
        assert_eq!(message.get::<u64>("count").unwrap(), u64::MAX);
        assert_eq!(message.get::<String>("name").unwrap(), "module");
        assert_eq!(message.get::<Vec<String>>("tags").unwrap(), ["a", "b"]);
        assert_eq!(message.get::<Position>("position").unwrap(), position);
        assert_eq!(message.get::<Option<i16>>("maybe").unwrap(), None);
        assert_eq!(message.len(), 6);
    }

    #[test]
    fn missing_key_get_fails_extract_is_none() {
        let mut message = CompositeMessage::new(COMPOSITE);
        assert!(matches!(
            message.get::<String>("absent"),
            Err(CodecError::FieldNotFound(_))
        ));
        assert_eq!(message.extract::<String>("absent").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut message = CompositeMessage::new(COMPOSITE);
        message.set("k", &1i32).unwrap();
        message.set("k", &2i32).unwrap();
        assert_eq!(message.get::<i32>("k").unwrap(), 2);
        assert_eq!(message.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let mut message = CompositeMessage::new(COMPOSITE);
        message.set("k", "v").unwrap();
        assert!(message.contains_key("k"));
        assert!(message.remove("k"));
        assert!(!message.remove("k"));
        assert!(message.is_empty());
    }

    #[test]
    fn custom_code_survives_encoding() {
        let mut message = CompositeMessage::new(512);
        message.set("x", &1u8).unwrap();

        let decoded = CompositeMessage::decode(message.encode().unwrap()).unwrap();
        assert_eq!(decoded.code(), 512);
        assert_eq!(decoded, message);
    }

    #[test]
    fn compose_propagates_setup_errors() {
        let result = CompositeMessage::compose(COMPOSITE, |msg| {
            msg.set("ok", &1u8)?;
            Err(CodecError::FieldNotFound("missing".to_string()))
        });
        assert!(matches!(result, Err(CodecError::FieldNotFound(_))));
    }
}
