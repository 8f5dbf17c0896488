use std::collections::BTreeMap;

use modlink_frame::{BooleanMessage, CompositeMessage, Frame, Message, SHUTDOWN};
use modlink_module::HostConfig;
use serde::Serialize;

use crate::cmd::{load_host, SendArgs};
use crate::exit::{codec_error, load_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{describe_code, print_report, value_preview, OutputFormat};

#[derive(Serialize)]
struct SendOutput {
    module: String,
    code: i32,
    response: Option<ResponseOutput>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ResponseOutput {
    Boolean {
        code: i32,
        value: bool,
    },
    Composite {
        code: i32,
        fields: BTreeMap<String, String>,
    },
}

pub fn run(args: SendArgs, config: &HostConfig, format: OutputFormat) -> CliResult<i32> {
    if args.code == SHUTDOWN {
        return Err(CliError::new(
            USAGE,
            "code -1 is the shutdown sentinel; modules are unloaded automatically",
        ));
    }

    let message = build_message(&args).map_err(|err| codec_error("encode failed", err))?;

    let mut host = load_host(&args.path, config)?;
    let response = host
        .send_message(&message)
        .map_err(|err| codec_error("encode failed", err))?;
    let response = response
        .map(decode_response)
        .transpose()
        .map_err(|err| codec_error("decode failed", err))?;

    let out = SendOutput {
        module: host.name().to_string(),
        code: args.code,
        response,
    };
    host.unload()
        .map_err(|err| load_error("unload failed", err))?;

    print_report(&out, rows(&out), format);
    Ok(SUCCESS)
}

fn build_message(args: &SendArgs) -> modlink_frame::Result<CompositeMessage> {
    let mut message = CompositeMessage::new(args.code);
    for (key, value) in &args.fields {
        message.set(key.as_str(), value.as_str())?;
    }
    for (key, value) in &args.ints {
        message.set(key.as_str(), value)?;
    }
    Ok(message)
}

/// Payload-less responses are booleans; anything else is read as a composite.
fn decode_response(frame: Frame) -> modlink_frame::Result<ResponseOutput> {
    if frame.content().is_null() {
        let reply = BooleanMessage::decode(frame)?;
        return Ok(ResponseOutput::Boolean {
            code: reply.code,
            value: reply.value,
        });
    }

    let reply = CompositeMessage::decode(frame)?;
    let fields = reply
        .keys()
        .map(|key| (key.to_string(), value_preview(&reply, key)))
        .collect();
    Ok(ResponseOutput::Composite {
        code: reply.code(),
        fields,
    })
}

fn rows(out: &SendOutput) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("module", out.module.clone()),
        ("sent code", describe_code(out.code)),
    ];
    match &out.response {
        None => rows.push(("response", "none".to_string())),
        Some(ResponseOutput::Boolean { code, value }) => {
            rows.push(("response code", describe_code(*code)));
            rows.push(("value", value.to_string()));
        }
        Some(ResponseOutput::Composite { code, fields }) => {
            rows.push(("response code", describe_code(*code)));
            for (key, value) in fields {
                rows.push(("field", format!("{key}={value}")));
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use modlink_frame::{encode_boolean, COMPOSITE};

    use super::*;

    fn args(fields: &[(&str, &str)], ints: &[(&str, i64)]) -> SendArgs {
        SendArgs {
            path: PathBuf::from("libecho.so"),
            code: COMPOSITE,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ints: ints.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn build_message_encodes_fields_and_ints() {
        let message = build_message(&args(&[("greeting", "Hello")], &[("age", 45)])).unwrap();
        assert_eq!(message.code(), COMPOSITE);
        assert_eq!(message.get::<String>("greeting").unwrap(), "Hello");
        assert_eq!(message.get::<i64>("age").unwrap(), 45);
    }

    #[test]
    fn boolean_response_is_decoded() {
        let response = decode_response(encode_boolean(true, 7)).unwrap();
        assert!(matches!(
            response,
            ResponseOutput::Boolean {
                code: 7,
                value: true
            }
        ));
    }

    #[test]
    fn composite_response_is_previewed() {
        let frame = CompositeMessage::compose_default(|msg| {
            msg.set("echoed_by", "echo")?;
            msg.set("count", &3_i64)
        })
        .unwrap();

        let ResponseOutput::Composite { code, fields } = decode_response(frame).unwrap() else {
            panic!("expected a composite response");
        };
        assert_eq!(code, COMPOSITE);
        assert_eq!(fields["echoed_by"], "echo");
        assert_eq!(fields["count"], "3");
    }
}
