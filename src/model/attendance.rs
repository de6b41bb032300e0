use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row as returned by the vendor, keyed by its own field names.
pub type RawAttendanceRecord = Map<String, Value>;

/// An attendance row in the destination schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub rut_rol: Option<i64>,
    pub nombre_rol: Option<String>,
    pub instalacion_rol: Option<String>,
    pub hora_ingreso_oficial: Option<NaiveDateTime>,
    pub ult_log_marca_asistencia: Option<NaiveDateTime>,
    pub metodo_usuario_marcaje: Option<String>,
    pub cliente_rol: Option<String>,
    pub tipo_turno: Option<String>,
    pub cod_turno: Option<String>,
    pub hora_salida_oficial: Option<NaiveDateTime>,
    pub horas_totales_turno: Option<f64>,
    pub horas_totales_asistencia: Option<f64>,
    pub fecha_marca_entrada: Option<NaiveDateTime>,
    pub fecha_marca_salida: Option<NaiveDateTime>,

    // Vendor flags, not part of the persisted schema
    pub corresponde_turno: bool,
    pub marca_turno: bool,
    pub atraso_en_entrada: bool,

    /// Set when the batch is stamped right before loading.
    pub fecha_carga: Option<NaiveDateTime>,
    pub origen_datos: Option<String>,
}

impl AttendanceRecord {
    pub fn stamp(&mut self, loaded_at: NaiveDateTime, origin: &str) {
        self.fecha_carga = Some(loaded_at);
        self.origen_datos = Some(origin.to_string());
    }
}
