//! Connection configuration for the bridge endpoint.

use serde::{Deserialize, Serialize};

/// Connection configuration (TCP or RTU).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// Modbus TCP connection
    Tcp {
        /// Host address (IP or hostname)
        host: String,
        /// TCP port (default: 502)
        #[serde(default = "default_modbus_port")]
        port: u16,
    },
    /// Modbus RTU (serial) connection
    Rtu {
        /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
        port: String,
        /// Baud rate (default: 9600)
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Data bits (default: 8)
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Parity: "none", "even", or "odd" (default: "none")
        #[serde(default = "default_parity")]
        parity: String,
        /// Stop bits: 1 or 2 (default: 1)
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
}

fn default_modbus_port() -> u16 {
    502
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl ConnectionConfig {
    /// Validate the connection parameters.
    ///
    /// Returns a human-readable description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ConnectionConfig::Tcp { host, .. } => {
                if host.is_empty() {
                    return Err("TCP host cannot be empty".to_string());
                }
            }
            ConnectionConfig::Rtu { port, parity, .. } => {
                if port.is_empty() {
                    return Err("Serial port cannot be empty".to_string());
                }
                match parity.to_lowercase().as_str() {
                    "none" | "even" | "odd" => {}
                    other => {
                        return Err(format!(
                            "Invalid parity '{}' (use none, even, or odd)",
                            other
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_defaults() {
        let json = r#"{ type: "tcp", host: "192.168.1.10" }"#;
        let config: ConnectionConfig = json5::from_str(json).unwrap();

        if let ConnectionConfig::Tcp { host, port } = &config {
            assert_eq!(host, "192.168.1.10");
            assert_eq!(*port, 502); // default
        } else {
            panic!("Expected TCP connection");
        }
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_rtu_defaults() {
        let json = r#"{ type: "rtu", port: "/dev/ttyUSB0", baud_rate: 19200, parity: "even" }"#;
        let config: ConnectionConfig = json5::from_str(json).unwrap();

        if let ConnectionConfig::Rtu {
            port,
            baud_rate,
            data_bits,
            parity,
            stop_bits,
        } = &config
        {
            assert_eq!(port, "/dev/ttyUSB0");
            assert_eq!(*baud_rate, 19200);
            assert_eq!(*data_bits, 8);
            assert_eq!(parity, "even");
            assert_eq!(*stop_bits, 1);
        } else {
            panic!("Expected RTU connection");
        }
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_bad_parity() {
        let json = r#"{ type: "rtu", port: "/dev/ttyUSB0", parity: "mark" }"#;
        let config: ConnectionConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_host() {
        let config = ConnectionConfig::Tcp {
            host: String::new(),
            port: 502,
        };
        assert!(config.validate().is_err());
    }
}
