/// Result codes shared by every plugin.
///
/// `0` is success, `10000..=10013` are the standard categories web content
/// already knows from mini-program Bluetooth APIs, negative codes are
/// extensions of this SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Operation succeeded.
    Success,
    /// Adapter not initialized.
    NotInit,
    /// Adapter unavailable (switched off or unsupported).
    NotAvailable,
    /// Device not found.
    NoDevice,
    /// Connection failed.
    ConnectionFail,
    /// Service not found.
    NoService,
    /// Characteristic not found.
    NoCharacteristic,
    /// Connection lost.
    NoConnection,
    /// Characteristic does not support the operation.
    PropertyNotSupport,
    /// Any other platform-reported failure.
    SystemError,
    /// Platform version does not support the operation.
    SystemNotSupport,
    /// Device already connected.
    AlreadyConnect,
    /// Pairing requires a PIN.
    NeedPin,
    /// Operation timed out.
    OperateTimeOut,
    /// Missing or malformed input.
    InvalidData,
    /// Bluetooth switched off.
    BluetoothNotOpen,
    /// Permission denied by the user.
    PermissionDenied,
    /// Device not found among scanned or connected devices.
    DeviceNotFound,
    /// Connection attempt timed out.
    ConnectTimeout,
    /// Characteristic not found.
    CharacteristicNotFound,
    /// Characteristic rejected a write.
    WriteNotSupported,
    /// Permission not yet granted.
    PermissionNotDetermined,
    /// Scanning is not possible right now.
    ScanNotAvailable,
    /// No peripheral or host object to operate on.
    PeripheralNil,
    /// Anything else.
    Unknown,
}

const ALL: [ErrorCode; 25] = [
    ErrorCode::Success,
    ErrorCode::NotInit,
    ErrorCode::NotAvailable,
    ErrorCode::NoDevice,
    ErrorCode::ConnectionFail,
    ErrorCode::NoService,
    ErrorCode::NoCharacteristic,
    ErrorCode::NoConnection,
    ErrorCode::PropertyNotSupport,
    ErrorCode::SystemError,
    ErrorCode::SystemNotSupport,
    ErrorCode::AlreadyConnect,
    ErrorCode::NeedPin,
    ErrorCode::OperateTimeOut,
    ErrorCode::InvalidData,
    ErrorCode::BluetoothNotOpen,
    ErrorCode::PermissionDenied,
    ErrorCode::DeviceNotFound,
    ErrorCode::ConnectTimeout,
    ErrorCode::CharacteristicNotFound,
    ErrorCode::WriteNotSupported,
    ErrorCode::PermissionNotDetermined,
    ErrorCode::ScanNotAvailable,
    ErrorCode::PeripheralNil,
    ErrorCode::Unknown,
];

impl ErrorCode {
    /// Numeric code as sent to web content.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotInit => 10000,
            Self::NotAvailable => 10001,
            Self::NoDevice => 10002,
            Self::ConnectionFail => 10003,
            Self::NoService => 10004,
            Self::NoCharacteristic => 10005,
            Self::NoConnection => 10006,
            Self::PropertyNotSupport => 10007,
            Self::SystemError => 10008,
            Self::SystemNotSupport => 10009,
            Self::AlreadyConnect => 10010,
            Self::NeedPin => 10011,
            Self::OperateTimeOut => 10012,
            Self::InvalidData => 10013,
            Self::BluetoothNotOpen => -1,
            Self::PermissionDenied => -2,
            Self::DeviceNotFound => -3,
            Self::ConnectTimeout => -4,
            Self::CharacteristicNotFound => -5,
            Self::WriteNotSupported => -6,
            Self::PermissionNotDetermined => -7,
            Self::ScanNotAvailable => -8,
            Self::PeripheralNil => -9,
            Self::Unknown => -99,
        }
    }

    /// Default message for the code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::NotInit => "not init",
            Self::NotAvailable => "not available",
            Self::NoDevice => "no device",
            Self::ConnectionFail => "connection fail",
            Self::NoService => "no service",
            Self::NoCharacteristic => "no characteristic",
            Self::NoConnection => "no connection",
            Self::PropertyNotSupport => "property not support",
            Self::SystemError => "system error",
            Self::SystemNotSupport => "system not support",
            Self::AlreadyConnect => "already connect",
            Self::NeedPin => "need pin",
            Self::OperateTimeOut => "operate time out",
            Self::InvalidData => "invalid_data",
            Self::BluetoothNotOpen => "bluetooth is not open",
            Self::PermissionDenied => "bluetooth permission denied, enable it in settings",
            Self::DeviceNotFound => "device not found",
            Self::ConnectTimeout => "device connection timed out",
            Self::CharacteristicNotFound => "characteristic not found",
            Self::WriteNotSupported => "characteristic does not support writing",
            Self::PermissionNotDetermined => "bluetooth permission not granted yet",
            Self::ScanNotAvailable => "cannot scan for bluetooth devices right now",
            Self::PeripheralNil => "peripheral object is missing",
            Self::Unknown => "unknown error",
        }
    }

    /// Maps a numeric code back; unknown values become [`ErrorCode::Unknown`].
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        ALL.into_iter()
            .find(|candidate| candidate.code() == code)
            .unwrap_or(Self::Unknown)
    }
}
