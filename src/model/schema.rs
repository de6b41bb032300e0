//! Fixed layout of the destination table and the vendor → canonical field names.

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColumnType {
    Integer,
    String,
    DateTime,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::String => "TEXT",
            ColumnType::DateTime => "DATETIME",
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

const fn col(name: &'static str, kind: ColumnType) -> Column {
    Column { name, kind }
}

pub const DESTINATION_COLUMNS: [Column; 16] = [
    col("rut_rol", ColumnType::Integer),
    col("nombre_rol", ColumnType::String),
    col("instalacion_rol", ColumnType::String),
    col("hora_ingreso_oficial", ColumnType::DateTime),
    col("ult_log_marca_asistencia", ColumnType::DateTime),
    col("metodo_usuario_marcaje", ColumnType::String),
    col("cliente_rol", ColumnType::String),
    col("tipo_turno", ColumnType::String),
    col("cod_turno", ColumnType::String),
    col("hora_salida_oficial", ColumnType::DateTime),
    col("horas_totales_turno", ColumnType::Integer),
    col("horas_totales_asistencia", ColumnType::Integer),
    col("fecha_carga", ColumnType::DateTime),
    col("origen_datos", ColumnType::String),
    col("fecha_marca_entrada", ColumnType::DateTime),
    col("fecha_marca_salida", ColumnType::DateTime),
];

// Vendor field names
pub const RUT_ROL: &str = "RutRol";
pub const TURNO: &str = "Turno";
pub const HR_TOT_ROL: &str = "HrTotRol";
pub const HR_TOT_ASI: &str = "Hr. Tot. Asi.";
pub const HER: &str = "Her";
pub const HSR: &str = "Hsr";
pub const FLOG_ASI: &str = "FlogAsi";
pub const FECHA_MARCA_ENTRADA: &str = "FechaMarcaEntrada";
pub const FECHA_MARCA_SALIDA: &str = "FechaMarcaSalida";
pub const CORRESPONDE_TURNO: &str = "corresponde_turno";
pub const MARCA_TURNO: &str = "Marca_turno";
pub const ATRASO_EN_ENTRADA: &str = "Atraso_en_entrada";

/// Vendor key → destination column.
pub const FIELD_RENAMES: [(&str, &str); 14] = [
    (RUT_ROL, "rut_rol"),
    ("NombreRol", "nombre_rol"),
    ("Instalación Rol", "instalacion_rol"),
    (HER, "hora_ingreso_oficial"),
    (FLOG_ASI, "ult_log_marca_asistencia"),
    ("UlogAsi", "metodo_usuario_marcaje"),
    ("Cliente Rol", "cliente_rol"),
    ("Tipo de Turno", "tipo_turno"),
    (TURNO, "cod_turno"),
    (HSR, "hora_salida_oficial"),
    (HR_TOT_ROL, "horas_totales_turno"),
    (HR_TOT_ASI, "horas_totales_asistencia"),
    (FECHA_MARCA_ENTRADA, "fecha_marca_entrada"),
    (FECHA_MARCA_SALIDA, "fecha_marca_salida"),
];

pub fn canonical_name(vendor_key: &str) -> Option<&'static str> {
    FIELD_RENAMES
        .iter()
        .find(|(vendor, _)| *vendor == vendor_key)
        .map(|(_, canonical)| *canonical)
}
