// Modbus RTU slave protocol for the actuator register bank

use crate::fmt::*;
use crate::register_bridge::Transaction;
use crate::registers::{is_writable, RegisterBank, REGISTER_COUNT};

/// Modbus function codes
pub mod function_codes {
    /// Read Holding Registers (start: u16, quantity: u16)
    pub const READ_HOLDING_REGISTERS: u8 = 0x03;

    /// Write Single Register (address: u16, value: u16)
    pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

    /// Write Multiple Registers (start: u16, quantity: u16, byte_count: u8, values..)
    pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

    /// Set on the function code of an exception response
    pub const EXCEPTION_FLAG: u8 = 0x80;
}

/// Address that every slave accepts writes on, without replying
pub const BROADCAST_ADDRESS: u8 = 0;

/// Largest RTU frame (address + PDU + CRC)
pub const MAX_FRAME_LEN: usize = 256;

/// Protocol limit for a single read request
pub const MAX_READ_QUANTITY: u16 = 125;

/// Protocol limit for a single write-multiple request
pub const MAX_WRITE_QUANTITY: u16 = 123;

/// Address + function + CRC
const MIN_FRAME_LEN: usize = 4;

/// Frame-level errors. The slave stays silent on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    TooShort,
    CrcMismatch,
}

/// Exception codes returned to the master
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Exception {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
}

/// Decoded request PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    ReadHoldingRegisters { start: u16, quantity: u16 },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleRegisters { start: u16, quantity: u16, values: &'a [u8] },
}

/// Frame with a valid CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub address: u8,
    pub function: u8,
    pub data: &'a [u8],
}

/// Result of processing a frame addressed to this slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    /// Status handed to the register bridge
    pub transaction: Transaction,
    /// Bytes of the response buffer to send (0 = stay silent)
    pub response_len: usize,
}

/// CRC-16/MODBUS (reflected poly 0xA001, init 0xFFFF)
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Check length and CRC, split the frame into its fields
///
/// # Arguments
/// * `frame` - Raw bytes received between two line-idle gaps
///
/// # Returns
/// * `Ok(Frame)` if the CRC matches
/// * `Err(FrameError)` otherwise
pub fn decode_frame(frame: &[u8]) -> Result<Frame<'_>, FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort);
    }

    let (body, crc_bytes) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    if crc16(body) != received {
        return Err(FrameError::CrcMismatch);
    }

    Ok(Frame {
        address: body[0],
        function: body[1],
        data: &body[2..],
    })
}

/// Parse the request PDU data for a function code
pub fn parse_request(function: u8, data: &[u8]) -> Result<Request<'_>, Exception> {
    match function {
        function_codes::READ_HOLDING_REGISTERS => {
            if data.len() != 4 {
                return Err(Exception::IllegalDataValue);
            }
            Ok(Request::ReadHoldingRegisters {
                start: u16::from_be_bytes([data[0], data[1]]),
                quantity: u16::from_be_bytes([data[2], data[3]]),
            })
        }
        function_codes::WRITE_SINGLE_REGISTER => {
            if data.len() != 4 {
                return Err(Exception::IllegalDataValue);
            }
            Ok(Request::WriteSingleRegister {
                address: u16::from_be_bytes([data[0], data[1]]),
                value: u16::from_be_bytes([data[2], data[3]]),
            })
        }
        function_codes::WRITE_MULTIPLE_REGISTERS => {
            if data.len() < 5 {
                return Err(Exception::IllegalDataValue);
            }
            let quantity = u16::from_be_bytes([data[2], data[3]]);
            let byte_count = data[4] as usize;
            let values = &data[5..];
            if byte_count != quantity as usize * 2 || values.len() != byte_count {
                return Err(Exception::IllegalDataValue);
            }
            Ok(Request::WriteMultipleRegisters {
                start: u16::from_be_bytes([data[0], data[1]]),
                quantity,
                values,
            })
        }
        _ => Err(Exception::IllegalFunction),
    }
}

/// Apply a request to the register bank and encode the response PDU
///
/// # Arguments
/// * `request` - Parsed request
/// * `regs` - Register bank (left untouched when an exception is returned)
/// * `pdu` - Output buffer, receives function code + data
///
/// # Returns
/// * `Ok(len)` - Length of the response PDU written to `pdu`
/// * `Err(Exception)` - Request rejected
pub fn apply_request(
    request: &Request<'_>,
    regs: &mut RegisterBank,
    pdu: &mut [u8],
) -> Result<usize, Exception> {
    match *request {
        Request::ReadHoldingRegisters { start, quantity } => {
            if quantity == 0 || quantity > MAX_READ_QUANTITY {
                return Err(Exception::IllegalDataValue);
            }
            let range = register_range(start, quantity)?;

            pdu[0] = function_codes::READ_HOLDING_REGISTERS;
            pdu[1] = (quantity * 2) as u8;
            for (i, value) in regs[range].iter().enumerate() {
                pdu[2 + i * 2..4 + i * 2].copy_from_slice(&value.to_be_bytes());
            }
            Ok(2 + quantity as usize * 2)
        }
        Request::WriteSingleRegister { address, value } => {
            let index = address as usize;
            if index >= REGISTER_COUNT || !is_writable(index) {
                return Err(Exception::IllegalDataAddress);
            }
            regs[index] = value;

            pdu[0] = function_codes::WRITE_SINGLE_REGISTER;
            pdu[1..3].copy_from_slice(&address.to_be_bytes());
            pdu[3..5].copy_from_slice(&value.to_be_bytes());
            Ok(5)
        }
        Request::WriteMultipleRegisters {
            start,
            quantity,
            values,
        } => {
            if quantity == 0 || quantity > MAX_WRITE_QUANTITY {
                return Err(Exception::IllegalDataValue);
            }
            let range = register_range(start, quantity)?;
            if !range.clone().all(is_writable) {
                return Err(Exception::IllegalDataAddress);
            }
            for (reg, chunk) in regs[range].iter_mut().zip(values.chunks_exact(2)) {
                *reg = u16::from_be_bytes([chunk[0], chunk[1]]);
            }

            pdu[0] = function_codes::WRITE_MULTIPLE_REGISTERS;
            pdu[1..3].copy_from_slice(&start.to_be_bytes());
            pdu[3..5].copy_from_slice(&quantity.to_be_bytes());
            Ok(5)
        }
    }
}

/// Encode an exception response PDU
pub fn encode_exception(function: u8, exception: Exception, pdu: &mut [u8]) -> usize {
    pdu[0] = function | function_codes::EXCEPTION_FLAG;
    pdu[1] = exception as u8;
    2
}

fn register_range(start: u16, quantity: u16) -> Result<core::ops::Range<usize>, Exception> {
    let start = start as usize;
    let end = start + quantity as usize;
    if end > REGISTER_COUNT {
        return Err(Exception::IllegalDataAddress);
    }
    Ok(start..end)
}

/// Modbus RTU slave bound to one station address
#[derive(Debug, Clone, Copy)]
pub struct ModbusSlave {
    address: u8,
}

impl ModbusSlave {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Process one received RTU frame
    ///
    /// # Arguments
    /// * `frame` - Raw received bytes (including CRC)
    /// * `regs` - Register bank
    /// * `response` - Buffer for the complete response frame
    ///
    /// # Returns
    /// * `None` if the frame is addressed to another station
    /// * `Some(Reply)` otherwise; `response_len == 0` means no reply is sent
    pub fn process(
        &self,
        frame: &[u8],
        regs: &mut RegisterBank,
        response: &mut [u8; MAX_FRAME_LEN],
    ) -> Option<Reply> {
        let frame = match decode_frame(frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Modbus: dropping frame ({:?})", e);
                return Some(Reply {
                    transaction: Transaction::Error,
                    response_len: 0,
                });
            }
        };

        let broadcast = frame.address == BROADCAST_ADDRESS;
        if frame.address != self.address && !broadcast {
            return None;
        }
        if broadcast && frame.function == function_codes::READ_HOLDING_REGISTERS {
            return None;
        }

        let result = parse_request(frame.function, frame.data)
            .and_then(|request| apply_request(&request, regs, &mut response[1..]));

        let (transaction, pdu_len) = match result {
            Ok(len) => {
                debug!("Modbus: function 0x{:02X} handled", frame.function);
                (Transaction::Ok, len)
            }
            Err(exception) => {
                warn!(
                    "Modbus: function 0x{:02X} rejected ({:?})",
                    frame.function, exception
                );
                let len = encode_exception(frame.function, exception, &mut response[1..]);
                (Transaction::Error, len)
            }
        };

        if broadcast {
            return Some(Reply {
                transaction,
                response_len: 0,
            });
        }

        response[0] = self.address;
        let crc_at = 1 + pdu_len;
        let crc = crc16(&response[..crc_at]);
        response[crc_at..crc_at + 2].copy_from_slice(&crc.to_le_bytes());
        Some(Reply {
            transaction,
            response_len: crc_at + 2,
        })
    }
}
