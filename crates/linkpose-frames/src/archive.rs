//! Frame persistence record.
//!
//! A frame is stored as a TOML table:
//!
//! ```toml
//! id = 5              # or "grasp"
//! mode = 0            # 0 = local, 1 = global ("local"/"global" also read)
//! note = "Grasp"
//! translation = [0.1, 0.0, 0.25]
//! rotation = [0.0, 0.0, 1.0, 90.0]   # axis + angle in degrees
//! ```
//!
//! Reading applies every valid field. A malformed field is skipped and
//! reported, the rest of the record still loads. Translation and rotation
//! are independent: a missing or malformed one keeps the frame's prior
//! value.

use nalgebra::{Translation3, Unit, UnitQuaternion, Vector3};
use toml::{Table, Value};
use tracing::warn;

use linkpose_core::{ArchiveError, FrameError, GeneralId};

use crate::frame::{CoordinateFrame, FrameMode};

/// Read a record into `frame`. Returns the first field error, after all
/// valid fields have been applied.
pub fn read(frame: &CoordinateFrame, record: &Table) -> Result<(), ArchiveError> {
    let mut first_error: Option<ArchiveError> = None;
    let mut report = |err: ArchiveError| {
        warn!(error = %err, "frame record field skipped");
        first_error.get_or_insert(err);
    };

    if let Some(value) = record.get("id") {
        match GeneralId::from_toml(value) {
            Some(id) => {
                if !frame.reset_id(id.clone()) {
                    report(FrameError::DuplicateId(id).into());
                }
            }
            None => report(FrameError::InvalidId.into()),
        }
    }

    if let Some(value) = record.get("mode") {
        if let Err(err) = read_mode(frame, value) {
            report(err);
        }
    }

    if let Some(value) = record.get("note") {
        match value.as_str() {
            Some(note) => frame.set_note(note, false),
            None => report(invalid("note", "expected a string")),
        }
    }

    let mut position = frame.position();
    let mut moved = false;
    if let Some(value) = record.get("translation") {
        match read_floats::<3>("translation", value) {
            Ok([x, y, z]) => {
                position.translation = Translation3::new(x, y, z);
                moved = true;
            }
            Err(err) => report(err),
        }
    }
    if let Some(value) = record.get("rotation") {
        match read_rotation(value) {
            Ok(rotation) => {
                position.rotation = rotation;
                moved = true;
            }
            Err(err) => report(err),
        }
    }
    if moved {
        frame.set_position(position);
    }

    first_error.map_or(Ok(()), Err)
}

/// Write `frame` into `record`. The note is omitted when empty.
pub fn write(frame: &CoordinateFrame, record: &mut Table) {
    record.insert("id".into(), frame.id().to_toml());
    record.insert("mode".into(), Value::Integer(frame.mode().ordinal()));
    let note = frame.note();
    if !note.is_empty() {
        record.insert("note".into(), Value::String(note.to_string()));
    }
    drop(note);

    let position = frame.position();
    let t = position.translation.vector;
    record.insert("translation".into(), float_array(&[t.x, t.y, t.z]));

    let (axis, angle) = position
        .rotation
        .axis_angle()
        .map_or((Vector3::z(), 0.0), |(axis, angle)| (axis.into_inner(), angle));
    record.insert(
        "rotation".into(),
        float_array(&[axis.x, axis.y, axis.z, angle.to_degrees()]),
    );
}

/// Convenience: a fresh table holding `frame`.
pub fn to_table(frame: &CoordinateFrame) -> Table {
    let mut record = Table::new();
    write(frame, &mut record);
    record
}

fn read_mode(frame: &CoordinateFrame, value: &Value) -> Result<(), ArchiveError> {
    let mode = match value {
        Value::Integer(ordinal) => {
            FrameMode::from_ordinal(*ordinal).ok_or(FrameError::InvalidMode(*ordinal))?
        }
        Value::String(symbol) => match symbol.as_str() {
            "local" => FrameMode::Local,
            "global" => FrameMode::Global,
            _ => return Err(invalid("mode", &format!("unknown mode \"{symbol}\""))),
        },
        _ => return Err(invalid("mode", "expected an ordinal")),
    };
    frame.set_mode(mode);
    Ok(())
}

fn read_rotation(value: &Value) -> Result<UnitQuaternion<f32>, ArchiveError> {
    let [ax, ay, az, angle] = read_floats::<4>("rotation", value)?;
    if angle == 0.0 {
        return Ok(UnitQuaternion::identity());
    }
    let axis = Unit::try_new(Vector3::new(ax, ay, az), 1.0e-9)
        .ok_or_else(|| invalid("rotation", "axis has zero length"))?;
    Ok(UnitQuaternion::from_axis_angle(&axis, angle.to_radians()))
}

fn read_floats<const N: usize>(field: &'static str, value: &Value) -> Result<[f32; N], ArchiveError> {
    let array = value
        .as_array()
        .filter(|a| a.len() == N)
        .ok_or_else(|| invalid(field, &format!("expected an array of {N} numbers")))?;
    let mut out = [0.0_f32; N];
    for (slot, item) in out.iter_mut().zip(array) {
        *slot = match item {
            Value::Float(f) => *f as f32,
            Value::Integer(i) => *i as f32,
            _ => return Err(invalid(field, "expected a number")),
        };
    }
    Ok(out)
}

fn float_array(values: &[f32]) -> Value {
    Value::Array(values.iter().map(|v| Value::Float(f64::from(*v))).collect())
}

fn invalid(field: &'static str, message: &str) -> ArchiveError {
    ArchiveError::InvalidField {
        field,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Isometry3;

    use super::*;
    use crate::list::CoordinateFrameList;

    fn parse(text: &str) -> Table {
        text.parse::<Table>().unwrap()
    }

    #[test]
    fn read_full_record() {
        let frame = CoordinateFrame::new(1);
        let record = parse(
            r#"
            id = "grasp"
            mode = 1
            note = "Grasp point"
            translation = [0.1, 0.2, 0.3]
            rotation = [0.0, 0.0, 1.0, 90.0]
            "#,
        );
        read(&frame, &record).unwrap();

        assert_eq!(frame.id(), GeneralId::from("grasp"));
        assert!(frame.is_global());
        assert_eq!(&*frame.note(), "Grasp point");
        let p = frame.position();
        assert_relative_eq!(p.translation.vector.z, 0.3, epsilon = 1e-6);
        assert_relative_eq!(p.rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn missing_position_keeps_prior_transform() {
        let prior = Isometry3::translation(1.0, 2.0, 3.0);
        let frame = CoordinateFrame::with_transform(1, prior);
        read(&frame, &parse("note = \"n\"")).unwrap();
        assert_relative_eq!(frame.position().translation.vector.x, 1.0);
        assert_relative_eq!(frame.position().translation.vector.z, 3.0);
    }

    #[test]
    fn translation_alone_keeps_prior_rotation() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let prior = Isometry3::from_parts(Translation3::new(1.0, 1.0, 1.0), yaw);
        let frame = CoordinateFrame::with_transform(1, prior);
        read(&frame, &parse("translation = [0.5, 0.0, 0.0]")).unwrap();
        let p = frame.position();
        assert_relative_eq!(p.translation.vector, Vector3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(p.rotation.angle(), 0.7, epsilon = 1e-5);
    }

    #[test]
    fn rotation_alone_keeps_prior_translation() {
        let frame = CoordinateFrame::with_transform(1, Isometry3::translation(0.2, -0.4, 0.6));
        read(&frame, &parse("rotation = [1.0, 0.0, 0.0, 90.0]")).unwrap();
        let p = frame.position();
        assert_relative_eq!(p.translation.vector, Vector3::new(0.2, -0.4, 0.6), epsilon = 1e-6);
        assert_relative_eq!(p.rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn malformed_rotation_still_applies_translation() {
        let frame = CoordinateFrame::new(1);
        let record = parse("translation = [0.0, 3.0, 0.0]\nrotation = [0.0, 0.0, 0.0, 45.0]");
        let err = read(&frame, &record).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidField { field: "rotation", .. }));
        assert_relative_eq!(frame.position().translation.vector.y, 3.0);
        assert_relative_eq!(frame.position().rotation.angle(), 0.0);
    }

    #[test]
    fn bad_fields_do_not_abort_record() {
        let frame = CoordinateFrame::new(1);
        let record = parse(
            r#"
            id = -4
            mode = 7
            note = "still read"
            translation = [1.0, 0.0, 0.0]
            "#,
        );
        let err = read(&frame, &record).unwrap_err();
        assert_eq!(err, ArchiveError::Frame(FrameError::InvalidId));
        assert_eq!(frame.id(), GeneralId::Int(1));
        assert!(frame.is_local());
        assert_eq!(&*frame.note(), "still read");
        assert_relative_eq!(frame.position().translation.vector.x, 1.0);
    }

    #[test]
    fn duplicate_id_is_reported_and_rest_applied() {
        let list = CoordinateFrameList::new();
        assert!(list.append(CoordinateFrame::new(1)));
        let frame = CoordinateFrame::new(2);
        assert!(list.append(std::rc::Rc::clone(&frame)));

        let err = read(&frame, &parse("id = 1\nmode = \"global\"")).unwrap_err();
        assert_eq!(err, ArchiveError::Frame(FrameError::DuplicateId(GeneralId::Int(1))));
        assert_eq!(frame.id(), GeneralId::Int(2));
        assert!(frame.is_global());
    }

    #[test]
    fn malformed_translation_is_reported() {
        let frame = CoordinateFrame::new(1);
        let err = read(&frame, &parse("translation = [1.0, 2.0]")).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidField { field: "translation", .. }));
    }

    #[test]
    fn write_then_read_restores_frame() {
        let source = CoordinateFrame::with_transform(
            7,
            Isometry3::from_parts(
                Translation3::new(0.5, -0.25, 1.0),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.75),
            ),
        );
        source.set_note("Tool", false);
        source.set_mode(FrameMode::Global);

        let record = to_table(&source);
        let target = CoordinateFrame::new(1);
        read(&target, &record).unwrap();

        assert_eq!(target.id(), GeneralId::Int(7));
        assert!(target.is_global());
        assert_eq!(&*target.note(), "Tool");
        let (a, b) = (source.position(), target.position());
        assert_relative_eq!(a.translation.vector, b.translation.vector, epsilon = 1e-6);
        assert_relative_eq!(a.rotation.angle_to(&b.rotation), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn write_identity_rotation_and_skip_empty_note() {
        let record = to_table(&CoordinateFrame::new("base"));
        assert_eq!(record.get("id"), Some(&Value::String("base".into())));
        assert!(record.get("note").is_none());
        let rotation = record.get("rotation").unwrap().as_array().unwrap();
        assert_eq!(rotation.last(), Some(&Value::Float(0.0)));
    }
}
