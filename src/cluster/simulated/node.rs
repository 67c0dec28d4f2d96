/// One tablet server: a fixed rpc address plus a live diagnostics endpoint.
struct SimulatedNode {
    rpc_address: HostPort,
    web_port: u16,
    metrics: Arc<NodeMetrics>,
    server: StdMutex<Option<JoinHandle<()>>>,
}

impl SimulatedNode {
    async fn start(index: usize, config: &SimulatedClusterConfig) -> Result<Self> {
        let rpc_port = config.base_rpc_port + index as u16;
        let rpc_address = HostPort::new(config.host.clone(), rpc_port);
        let metrics = Arc::new(NodeMetrics::new(format!("tserver-{}", index)));
        let (web_port, handle) = serve_diagnostics(&config.host, Arc::clone(&metrics)).await?;
        event!(
            Level::DEBUG,
            node = index,
            rpc = %rpc_address,
            web_port,
            "simulated tablet server started"
        );
        Ok(Self {
            rpc_address,
            web_port,
            metrics,
            server: StdMutex::new(Some(handle)),
        })
    }

    /// Aborts the diagnostics server and waits for its listener to close.
    /// Returns false if it was already stopped.
    async fn stop_diagnostics(&self) -> Result<bool> {
        let handle = self.server.lock()?.take();
        match handle {
            Some(handle) => {
                handle.abort();
                // The join error is the expected cancellation.
                let _ = handle.await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
