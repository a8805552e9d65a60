//! Responder HTTP mínimo, uma conexão por vez.
//!
//! Ciclo: `Listening → Accepted → Responding → Closed → Listening`.
//! Qualquer falha em uma conexão (reset, timeout, requisição malformada) é
//! logada e o responder volta a aceitar; não existe estado terminal.
//!
//! O timeout de leitura é um prazo total por conexão, não por `read()`:
//! um cliente que goteja bytes perde a vez quando o prazo acaba.

use power_core::config::HttpConfig;
use power_core::error::{ConnectionFault, InitFault};
use power_core::render::http_response;
use power_core::SharedReadingCell;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pausa após falha no `accept` (ex: limite de descritores).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);

/// Linha de requisição aceita (método e alvo, apenas para log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
}

/// Parâmetros de uma conexão, copiados da [`HttpConfig`].
#[derive(Debug, Clone, Copy)]
struct StreamLimits {
    /// Prazo total para o cabeçalho chegar
    read_timeout: Duration,
    write_timeout: Duration,
    max_request_bytes: usize,
}

/// Atividade de fundo que serve a última medição.
pub struct HttpResponder {
    listener: TcpListener,
    cell: Arc<SharedReadingCell>,
    limits: StreamLimits,
    served: u64,
}

impl HttpResponder {
    /// Abre o listener com backlog explícito. Falha aqui é fatal.
    pub fn bind(config: &HttpConfig, cell: Arc<SharedReadingCell>) -> Result<Self, InitFault> {
        let addr = config
            .bind_addr()
            .ok_or_else(|| InitFault::Address(config.bind_ip.clone()))?;
        let (Some(read_timeout), Some(write_timeout)) = (config.read_timeout(), config.write_timeout())
        else {
            return Err(InitFault::InvalidConfig(vec![format!(
                "Timeouts HTTP inválidos: leitura {}, escrita {}",
                config.read_timeout_secs, config.write_timeout_secs
            )]));
        };

        let listener =
            bind_listener(addr, config.backlog).map_err(|source| InitFault::Bind { addr, source })?;

        info!(
            "HTTP escutando em {addr} (backlog {}, timeouts {:.1}s/{:.1}s)",
            config.backlog, config.read_timeout_secs, config.write_timeout_secs
        );

        Ok(Self {
            listener,
            cell,
            limits: StreamLimits {
                read_timeout,
                write_timeout,
                max_request_bytes: config.max_request_bytes,
            },
            served: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Aceita e atende exatamente uma conexão.
    #[cfg(test)]
    pub fn serve_one(&mut self) -> Result<SocketAddr, ConnectionFault> {
        let (stream, peer) = self.listener.accept()?;
        self.respond(stream, peer)?;
        Ok(peer)
    }

    /// Loop da atividade de fundo. Não retorna.
    pub fn run(mut self) -> ! {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Erro no accept: {e}");
                    std::thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };

            if let Err(e) = self.respond(stream, peer) {
                if e.is_timeout() {
                    warn!("Conexão de {peer} expirou, descartada");
                } else {
                    warn!("Conexão de {peer} abandonada: {e}");
                }
            }
        }
    }

    fn respond(&mut self, mut stream: TcpStream, peer: SocketAddr) -> Result<(), ConnectionFault> {
        info!("Conexão de {peer}");
        stream.set_write_timeout(Some(self.limits.write_timeout))?;

        let mut timed = DeadlineReader {
            stream: &stream,
            deadline: Instant::now() + self.limits.read_timeout,
        };
        let head = read_request_head(&mut timed, self.limits.max_request_bytes)?;
        let request = parse_request_line(&head)?;
        debug!("{peer} → {} {}", request.method, request.target);

        // Lido só depois da requisição: a resposta reflete o valor mais recente
        let reading = self.cell.get();
        stream.write_all(&http_response(&reading))?;
        stream.flush()?;
        if let Err(e) = stream.shutdown(Shutdown::Write) {
            debug!("Shutdown da conexão de {peer} falhou: {e}");
        }

        self.served += 1;
        debug!("Resposta enviada a {peer} ({} no total)", self.served);
        Ok(())
    }
}

/// Leitor com prazo absoluto: cada `read()` espera só o tempo restante.
struct DeadlineReader<'a> {
    stream: &'a TcpStream,
    deadline: Instant,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "prazo da requisição esgotado",
            ));
        }
        self.stream.set_read_timeout(Some(remaining))?;
        let mut stream = self.stream;
        stream.read(buf)
    }
}

fn bind_listener(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    Ok(socket.into())
}

/// Lê o cabeçalho até a linha em branco, respeitando o limite de bytes.
fn read_request_head(stream: &mut impl Read, limit: usize) -> Result<String, ConnectionFault> {
    let mut head = Vec::with_capacity(256);
    let mut chunk = [0u8; 256];

    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            if head.is_empty() {
                return Err(ConnectionFault::Closed);
            }
            // Cliente fechou a escrita sem linha em branco: usa o que veio
            break;
        }
        head.extend_from_slice(&chunk[..n]);

        if head_complete(&head) {
            break;
        }
        if head.len() > limit {
            return Err(ConnectionFault::RequestTooLarge(limit));
        }
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn head_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.windows(2).any(|w| w == b"\n\n")
}

/// Valida `METHOD TARGET HTTP/x.y`; o resto da requisição é ignorado.
pub fn parse_request_line(head: &str) -> Result<RequestLine, ConnectionFault> {
    let line = head.lines().next().unwrap_or_default().trim_end_matches('\r');
    let malformed = || ConnectionFault::MalformedRequest(line.chars().take(64).collect());

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    if !method.bytes().all(|b| b.is_ascii_uppercase()) || !version.starts_with("HTTP/") {
        return Err(malformed());
    }

    Ok(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
    })
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
