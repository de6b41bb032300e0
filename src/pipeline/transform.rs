use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::DEFAULT_ORIGIN_TAG;
use crate::error::SyncError;
use crate::model::attendance::{AttendanceRecord, RawAttendanceRecord};
use crate::model::schema::{
    ATRASO_EN_ENTRADA, CORRESPONDE_TURNO, MARCA_TURNO, TURNO, canonical_name,
};

/// Vendor timestamp layout, e.g. `01-01-2024 08:00:00`.
pub const VENDOR_DATETIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Reshapes a vendor batch into destination rows.
#[derive(Debug, Clone)]
pub struct Transformer {
    excluded_shifts: HashSet<String>,
    origin: String,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(HashSet::new(), DEFAULT_ORIGIN_TAG)
    }
}

impl Transformer {
    pub fn new(excluded_shifts: HashSet<String>, origin: impl Into<String>) -> Self {
        Self {
            excluded_shifts,
            origin: origin.into(),
        }
    }

    /// Filters excluded shifts and normalizes every remaining record.
    ///
    /// The first invalid record fails the whole batch.
    pub fn transform(
        &self,
        raw: &[RawAttendanceRecord],
    ) -> Result<Vec<AttendanceRecord>, SyncError> {
        let records = raw
            .iter()
            .filter(|record| !self.is_excluded(record))
            .enumerate()
            .map(|(index, record)| normalize_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            received = raw.len(),
            processed = records.len(),
            "Attendance records processed"
        );
        Ok(records)
    }

    fn is_excluded(&self, record: &RawAttendanceRecord) -> bool {
        if self.excluded_shifts.is_empty() {
            return false;
        }
        match record.get(TURNO).and_then(text) {
            Some(code) if self.excluded_shifts.contains(&code) => {
                debug!(shift = %code, "Skipping excluded shift");
                true
            }
            _ => false,
        }
    }

    /// Stamps load time and source tag on every record of the batch.
    pub fn stamp(&self, records: &mut [AttendanceRecord], loaded_at: NaiveDateTime) {
        for record in records {
            record.stamp(loaded_at, &self.origin);
        }
    }
}

/// Vendor keys mapped to their destination column; unknown keys are dropped.
pub fn rename_fields(record: &RawAttendanceRecord) -> HashMap<&'static str, &Value> {
    record
        .iter()
        .filter_map(|(key, value)| canonical_name(key).map(|column| (column, value)))
        .collect()
}

fn normalize_record(
    index: usize,
    record: &RawAttendanceRecord,
) -> Result<AttendanceRecord, SyncError> {
    let flag = |field: &'static str| {
        record
            .get(field)
            .map(truthy)
            .ok_or(SyncError::MissingRequiredField {
                field,
                record: index,
            })
    };
    let corresponde_turno = flag(CORRESPONDE_TURNO)?;
    let marca_turno = flag(MARCA_TURNO)?;
    let atraso_en_entrada = flag(ATRASO_EN_ENTRADA)?;

    let fields = rename_fields(record);
    let get = |column: &str| fields.get(column).copied();
    let string = |column: &str| get(column).and_then(text);
    let decimal = |column: &'static str| parse_decimal(column, get(column));
    let timestamp = |column: &'static str| parse_timestamp(column, get(column));

    Ok(AttendanceRecord {
        rut_rol: parse_integer("rut_rol", get("rut_rol"))?,
        nombre_rol: string("nombre_rol"),
        instalacion_rol: string("instalacion_rol"),
        hora_ingreso_oficial: timestamp("hora_ingreso_oficial")?,
        ult_log_marca_asistencia: timestamp("ult_log_marca_asistencia")?,
        metodo_usuario_marcaje: string("metodo_usuario_marcaje"),
        cliente_rol: string("cliente_rol"),
        tipo_turno: string("tipo_turno"),
        cod_turno: string("cod_turno"),
        hora_salida_oficial: timestamp("hora_salida_oficial")?,
        horas_totales_turno: decimal("horas_totales_turno")?,
        horas_totales_asistencia: decimal("horas_totales_asistencia")?,
        fecha_marca_entrada: timestamp("fecha_marca_entrada")?,
        fecha_marca_salida: timestamp("fecha_marca_salida")?,
        corresponde_turno,
        marca_turno,
        atraso_en_entrada,
        fecha_carga: None,
        origen_datos: None,
    })
}

/// Scalar rendered as text; `null` is absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Decimal with either `,` or `.` as separator.
pub fn parse_decimal(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, SyncError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| SyncError::InvalidNumericFormat {
                field,
                value: s.clone(),
            }),
        Some(other) => Err(SyncError::InvalidNumericFormat {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_integer(field: &'static str, value: Option<&Value>) -> Result<Option<i64>, SyncError> {
    let invalid = |value: String| SyncError::InvalidNumericFormat { field, value };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Some(i)),
            (None, Some(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
            _ => Err(invalid(n.to_string())),
        },
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
    }
}

/// Vendor timestamp; empty strings and `null` are absent.
pub fn parse_timestamp(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Option<NaiveDateTime>, SyncError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => NaiveDateTime::parse_from_str(s.trim(), VENDOR_DATETIME_FORMAT)
            .map(Some)
            .map_err(|_| SyncError::InvalidDateFormat {
                field,
                value: s.clone(),
            }),
        Some(other) => Err(SyncError::InvalidDateFormat {
            field,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn raw(value: Value) -> RawAttendanceRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn record(shift: &str) -> RawAttendanceRecord {
        raw(json!({
            "RutRol": "12345678",
            "NombreRol": "Juan Perez",
            "Turno": shift,
            "corresponde_turno": true,
            "Marca_turno": 1,
            "Atraso_en_entrada": false,
        }))
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn decimal_comma_becomes_float() {
        let mut input = record("A");
        input.insert("HrTotRol".into(), json!("8,5"));
        input.insert("Hr. Tot. Asi.".into(), json!("7,25"));

        let out = Transformer::default().transform(&[input]).unwrap();
        assert_eq!(out[0].horas_totales_turno, Some(8.5));
        assert_eq!(out[0].horas_totales_asistencia, Some(7.25));
    }

    #[test]
    fn unparseable_hours_fail_the_batch() {
        let mut input = record("A");
        input.insert("HrTotRol".into(), json!("ocho"));

        let err = Transformer::default().transform(&[input]).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidNumericFormat { field: "horas_totales_turno", .. }
        ));
    }

    #[test]
    fn date_fields_are_parsed() {
        let mut input = record("A");
        input.insert("Her".into(), json!("01-01-2024 08:00:00"));
        input.insert("Hsr".into(), json!("01-01-2024 17:00:00"));
        input.insert("FlogAsi".into(), json!("01-01-2024 08:01:00"));
        input.insert("FechaMarcaEntrada".into(), json!("01-01-2024 08:01:00"));
        input.insert("FechaMarcaSalida".into(), json!("01-01-2024 17:02:00"));

        let out = Transformer::default().transform(&[input]).unwrap();
        let row = &out[0];
        assert_eq!(row.hora_ingreso_oficial, Some(at(8, 0, 0)));
        assert_eq!(row.hora_salida_oficial, Some(at(17, 0, 0)));
        assert_eq!(row.ult_log_marca_asistencia, Some(at(8, 1, 0)));
        assert_eq!(row.fecha_marca_entrada, Some(at(8, 1, 0)));
        assert_eq!(row.fecha_marca_salida, Some(at(17, 2, 0)));
    }

    #[test]
    fn malformed_date_fails_whole_batch() {
        let good = record("A");
        let mut bad = record("B");
        bad.insert("Her".into(), json!("2024-01-01T08:00:00"));

        let err = Transformer::default().transform(&[good, bad]).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidDateFormat { field: "hora_ingreso_oficial", .. }
        ));
    }

    #[test]
    fn blank_dates_are_null() {
        let mut input = record("A");
        input.insert("FechaMarcaSalida".into(), json!(""));
        input.insert("FechaMarcaEntrada".into(), Value::Null);

        let out = Transformer::default().transform(&[input]).unwrap();
        assert_eq!(out[0].fecha_marca_salida, None);
        assert_eq!(out[0].fecha_marca_entrada, None);
    }

    #[test]
    fn excluded_shifts_are_dropped() {
        let transformer = Transformer::new(HashSet::from(["X".to_string()]), "ControlRoll");
        let input = [record("A"), record("X"), record("B")];

        let out = transformer.transform(&input).unwrap();
        let shifts: Vec<_> = out.iter().map(|r| r.cod_turno.as_deref()).collect();
        assert_eq!(shifts, vec![Some("A"), Some("B")]);
    }

    #[test]
    fn empty_exclusion_set_keeps_everything() {
        let input = [record("A"), record("X")];
        assert_eq!(Transformer::default().transform(&input).unwrap().len(), 2);
    }

    #[test]
    fn flags_use_truthiness() {
        let mut input = record("A");
        input.insert("corresponde_turno".into(), json!("S"));
        input.insert("Marca_turno".into(), json!(0));
        input.insert("Atraso_en_entrada".into(), Value::Null);

        let out = Transformer::default().transform(&[input]).unwrap();
        assert!(out[0].corresponde_turno);
        assert!(!out[0].marca_turno);
        assert!(!out[0].atraso_en_entrada);
    }

    #[test]
    fn missing_flag_is_an_error() {
        let mut input = record("A");
        input.remove("Marca_turno");

        let err = Transformer::default().transform(&[input]).unwrap_err();
        assert!(matches!(
            err,
            SyncError::MissingRequiredField { field: "Marca_turno", record: 0 }
        ));
    }

    #[test]
    fn fields_are_renamed_and_coerced() {
        let input = raw(json!({
            "RutRol": 98765432,
            "NombreRol": "Ana",
            "Instalación Rol": "Planta Norte",
            "UlogAsi": "APP",
            "Cliente Rol": "Acme",
            "Tipo de Turno": "Diurno",
            "Turno": 7,
            "corresponde_turno": true,
            "Marca_turno": true,
            "Atraso_en_entrada": true,
            "Extra": "dropped",
        }));

        let row = Transformer::default().transform(&[input]).unwrap().remove(0);
        assert_eq!(row.rut_rol, Some(98765432));
        assert_eq!(row.nombre_rol.as_deref(), Some("Ana"));
        assert_eq!(row.instalacion_rol.as_deref(), Some("Planta Norte"));
        assert_eq!(row.metodo_usuario_marcaje.as_deref(), Some("APP"));
        assert_eq!(row.cliente_rol.as_deref(), Some("Acme"));
        assert_eq!(row.tipo_turno.as_deref(), Some("Diurno"));
        assert_eq!(row.cod_turno.as_deref(), Some("7"));
        assert_eq!(row.horas_totales_turno, None);
    }

    #[test]
    fn non_numeric_rut_is_rejected() {
        let mut input = record("A");
        input.insert("RutRol".into(), json!("12.345.678-9"));

        let err = Transformer::default().transform(&[input]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidNumericFormat { field: "rut_rol", .. }));
    }

    #[test]
    fn stamping_sets_load_metadata() {
        let transformer = Transformer::new(HashSet::new(), "Vendor");
        let mut rows = transformer.transform(&[record("A"), record("B")]).unwrap();
        assert!(rows.iter().all(|r| r.fecha_carga.is_none()));

        transformer.stamp(&mut rows, at(9, 30, 0));
        assert!(rows.iter().all(|r| r.fecha_carga == Some(at(9, 30, 0))));
        assert!(rows.iter().all(|r| r.origen_datos.as_deref() == Some("Vendor")));
    }
}
