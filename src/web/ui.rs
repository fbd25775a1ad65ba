use axum::response::{Html, IntoResponse};

/// 首页处理器
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Image Classification Service</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            color: #333;
            padding: 30px 0;
        }

        .container {
            background: white;
            border-radius: 20px;
            padding: 40px;
            box-shadow: 0 20px 60px rgba(0, 0, 0, 0.1);
            max-width: 760px;
            width: 90%;
        }

        h1 { color: #5a67d8; margin-bottom: 6px; font-size: 2em; text-align: center; }
        .subtitle { color: #666; margin-bottom: 24px; text-align: center; }

        .section { margin: 24px 0; text-align: left; }
        .section h2 { font-size: 1.1em; color: #4a5568; margin-bottom: 12px; }

        select, input[type=number] {
            padding: 8px 10px;
            border: 1px solid #cbd5e0;
            border-radius: 8px;
            font-size: 0.95em;
            margin-right: 10px;
        }

        .sliders { display: grid; grid-template-columns: repeat(2, 1fr); gap: 10px 24px; margin: 12px 0; }
        .sliders label { display: flex; justify-content: space-between; font-size: 0.9em; color: #4a5568; }

        .btn {
            background: linear-gradient(135deg, #5a67d8, #667eea);
            color: white;
            border: none;
            padding: 10px 24px;
            border-radius: 10px;
            font-size: 1em;
            cursor: pointer;
            margin-top: 10px;
        }
        .btn:hover { opacity: 0.9; }

        table { width: 100%; border-collapse: collapse; margin-top: 14px; }
        th, td { padding: 8px 10px; border-bottom: 1px solid #e2e8f0; text-align: left; font-size: 0.95em; }
        th { color: #4a5568; }

        .error { color: #c53030; margin-top: 10px; font-size: 0.9em; }

        .preview {
            display: none;
            max-width: 100%;
            max-height: 260px;
            margin-top: 12px;
            border-radius: 10px;
            border: 1px solid #e2e8f0;
        }

        canvas.histogram {
            display: none;
            width: 100%;
            height: 160px;
            margin-top: 12px;
            border: 1px solid #e2e8f0;
            border-radius: 10px;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Image Classification</h1>
        <div class="subtitle">Pick or upload an image, optionally edit it, and classify</div>

        <div class="section">
            <h2>1. Choose image and model</h2>
            <select id="imageSelect" onchange="showPreview()"></select>
            <select id="modelSelect"></select>
            <img id="preview" class="preview" alt="Selected image">
            <canvas id="histogram" class="histogram" width="512" height="160"></canvas>
        </div>

        <div class="section">
            <h2>2. Optional photometric edits</h2>
            <div class="sliders">
                <label>Color <input type="number" id="color" value="1.0" step="0.1" min="0"></label>
                <label>Brightness <input type="number" id="brightness" value="1.0" step="0.1" min="0"></label>
                <label>Contrast <input type="number" id="contrast" value="1.0" step="0.1" min="0"></label>
                <label>Sharpness <input type="number" id="sharpness" value="1.0" step="0.1" min="0"></label>
            </div>
            <button class="btn" onclick="classify(false)">Classify</button>
            <button class="btn" onclick="classify(true)">Edit + Classify</button>
        </div>

        <div class="section">
            <h2>3. Or upload your own</h2>
            <input type="file" id="fileInput" accept="image/*">
            <button class="btn" onclick="upload()">Upload + Classify</button>
        </div>

        <div class="section">
            <h2>Results</h2>
            <table>
                <thead><tr><th>Label</th><th>Score</th></tr></thead>
                <tbody id="results"></tbody>
            </table>
            <div class="error" id="error"></div>
        </div>
    </div>

    <script>
        async function loadInfo(selectImage) {
            const res = await fetch('/api/info');
            const body = await res.json();
            const images = body.data.images;
            const models = body.data.models;
            const imageSelect = document.getElementById('imageSelect');
            const previous = selectImage || imageSelect.value;
            imageSelect.innerHTML =
                images.map(i => `<option value="${i}">${i}</option>`).join('');
            if (images.includes(previous)) { imageSelect.value = previous; }
            document.getElementById('modelSelect').innerHTML =
                models.map(m => `<option value="${m}">${m}</option>`).join('');
            showPreview();
        }

        function showPreview() {
            const id = document.getElementById('imageSelect').value;
            const img = document.getElementById('preview');
            if (!id) { img.style.display = 'none'; return; }
            img.style.display = 'block';
            img.src = '/api/images/' + encodeURIComponent(id);
        }

        function drawHistogram() {
            const img = document.getElementById('preview');
            if (!img.naturalWidth) { return; }

            const scratch = document.createElement('canvas');
            scratch.width = img.naturalWidth;
            scratch.height = img.naturalHeight;
            const sctx = scratch.getContext('2d');
            sctx.drawImage(img, 0, 0);
            const data = sctx.getImageData(0, 0, scratch.width, scratch.height).data;

            const red = new Array(256).fill(0);
            const green = new Array(256).fill(0);
            const blue = new Array(256).fill(0);
            for (let i = 0; i < data.length; i += 4) {
                red[data[i]]++;
                green[data[i + 1]]++;
                blue[data[i + 2]]++;
            }

            const canvas = document.getElementById('histogram');
            canvas.style.display = 'block';
            const ctx = canvas.getContext('2d');
            ctx.clearRect(0, 0, canvas.width, canvas.height);
            const peak = Math.max(...red, ...green, ...blue, 1);
            const barWidth = canvas.width / 256;
            const channels = [
                ['rgba(220, 50, 50, 0.55)', red],
                ['rgba(50, 160, 70, 0.55)', green],
                ['rgba(50, 90, 220, 0.55)', blue],
            ];
            for (const [color, counts] of channels) {
                ctx.fillStyle = color;
                for (let v = 0; v < 256; v++) {
                    const h = (counts[v] / peak) * canvas.height;
                    ctx.fillRect(v * barWidth, canvas.height - h, barWidth, h);
                }
            }
        }

        document.getElementById('preview').onload = drawHistogram;

        function factor(id) { return parseFloat(document.getElementById(id).value); }

        function render(outcome) {
            document.getElementById('error').textContent = '';
            document.getElementById('results').innerHTML = outcome.predictions
                .map(p => `<tr><td>${p.label}</td><td>${p.score.toFixed(4)}</td></tr>`)
                .join('');
        }

        function renderError(body) {
            document.getElementById('results').innerHTML = '';
            document.getElementById('error').textContent =
                body.error ? `${body.error.code}: ${body.error.message}` : 'Request failed';
        }

        async function classify(withEdits) {
            const model_id = document.getElementById('modelSelect').value;
            const image_id = document.getElementById('imageSelect').value;
            let res;
            if (withEdits) {
                res = await fetch('/api/editor', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({
                        image_id, model_id,
                        color: factor('color'),
                        brightness: factor('brightness'),
                        contrast: factor('contrast'),
                        sharpness: factor('sharpness'),
                    }),
                });
            } else {
                res = await fetch('/api/classifications', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ model_id, image_id }),
                });
            }
            const body = await res.json();
            if (!res.ok) { renderError(body); return; }
            render(withEdits ? body.data.classification : body.data);
            loadInfo(withEdits ? body.data.image_id : undefined);
        }

        async function upload() {
            const input = document.getElementById('fileInput');
            if (!input.files.length) { return; }
            const form = new FormData();
            form.append('file', input.files[0]);
            form.append('model_id', document.getElementById('modelSelect').value);

            const res = await fetch('/api/upload', { method: 'POST', body: form });
            const body = await res.json();
            if (!res.ok) { renderError(body); return; }
            render(body.data.classification);
            loadInfo(body.data.image_id);
        }

        loadInfo();
    </script>
</body>
</html>
"#;
